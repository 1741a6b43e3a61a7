#![allow(dead_code)]

use std::path::PathBuf;

use diesel::prelude::*;
use diesel::sql_query;
use inventory_core::db::{connection, migrate};
use inventory_core::schema::tenants;
use tempfile::TempDir;

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_all(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn seed_tenant(conn: &mut SqliteConnection, id: &str, website: Option<&str>) {
    diesel::insert_into(tenants::table)
        .values((
            tenants::id.eq(id),
            tenants::name.eq(format!("{id} Motors")),
            tenants::website.eq(website),
            tenants::status.eq("active"),
            tenants::subscription_tier.eq("starter"),
            tenants::cost_settings.eq("{}"),
            tenants::created_at.eq("2026-01-01T00:00:00.000Z"),
        ))
        .execute(conn)
        .expect("seed tenant");
}

pub fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    #[derive(diesel::QueryableByName)]
    struct C {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        c: i64,
    }
    let q = format!("SELECT COUNT(*) AS c FROM {table}");
    sql_query(q).get_result::<C>(conn).unwrap().c
}
