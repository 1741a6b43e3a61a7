//! Embedded schema migrations.

use anyhow::anyhow;
use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::db::connection::connect_sqlite;

/// All migrations under `migrations/`, compiled into the binary so deploys
/// never depend on the source tree being present.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Bring a SQLite database at `url` up to date, applying the standard
/// PRAGMAs first.
pub fn run_sqlite(url: &str) -> anyhow::Result<()> {
    let mut conn = connect_sqlite(url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

/// Bring a PostgreSQL database at `url` up to date.
pub fn run_postgres(url: &str) -> anyhow::Result<()> {
    let mut conn = PgConnection::establish(url)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    Ok(())
}

/// Dispatch on the database URL: `postgres://`/`postgresql://` go to
/// Postgres, anything else (including a bare file path like `dev.db`) is
/// treated as SQLite.
pub fn run_all(database_url: &str) -> anyhow::Result<()> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        run_postgres(database_url)
    } else {
        run_sqlite(database_url)
    }
}
