//! SQLite connection helper.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

/// Open a SQLite connection with the PRAGMAs the engine depends on: WAL so
/// snapshot/log writers do not starve readers, foreign keys on (the schema
/// references `tenants` from every table), and a 5s busy timeout to ride out
/// a concurrently-running migration.
pub fn connect_sqlite(database_url: &str) -> anyhow::Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;

    sql_query("PRAGMA journal_mode=WAL;").execute(&mut conn)?;
    sql_query("PRAGMA foreign_keys=ON;").execute(&mut conn)?;
    sql_query("PRAGMA busy_timeout=5000;").execute(&mut conn)?;
    Ok(conn)
}
