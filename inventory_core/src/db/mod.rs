//! Connection and migration plumbing for the durable store.
//!
//! The engine runs against SQLite by default; Postgres stays reachable
//! through the same embedded migrations via [`migrate::run_all`], which
//! dispatches on the URL scheme. [`connection::connect_sqlite`] applies the
//! PRAGMAs every caller relies on (WAL, foreign keys, busy timeout), so all
//! connections should be opened through it rather than
//! `SqliteConnection::establish` directly.

pub mod connection;
pub mod migrate;
