//! Connection pool bootstrap for SQLite.
//!
//! # Responsibility
//! - Build the bounded, process-wide handle pool for file or memory stores.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable store.
//!
//! # Invariants
//! - Pooled connections have `foreign_keys=ON` and a busy timeout.
//! - Returned stores have migrations fully applied.
//! - The in-memory store holds exactly one connection, so every caller
//!   sees the same database.

use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::StoreConfig;
use log::{error, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// One connection checked out of the store pool.
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Explicitly owned handle to the backing store.
///
/// Cloning is cheap and shares the same pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Store")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl Store {
    /// Opens a file-backed store and applies all pending migrations.
    ///
    /// # Side effects
    /// - Creates the database file when missing.
    /// - Emits `store_open` logging events with duration and status.
    pub fn open(config: &StoreConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        info!(
            "event=store_open module=db status=start mode=file max_connections={}",
            config.max_connections()
        );

        let busy_timeout = config.busy_timeout();
        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| configure_connection(conn, busy_timeout, true));
        let pool = Pool::builder()
            .max_size(config.max_connections())
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout())
            .build(manager);

        finish_open(pool, "file", started_at)
    }

    /// Opens a single-connection in-memory store and applies all migrations.
    ///
    /// # Side effects
    /// - Emits `store_open` logging events with duration and status.
    pub fn open_in_memory() -> DbResult<Self> {
        let started_at = Instant::now();
        info!("event=store_open module=db status=start mode=memory max_connections=1");

        let busy_timeout = StoreConfig::default().busy_timeout();
        let manager = SqliteConnectionManager::memory()
            .with_init(move |conn| configure_connection(conn, busy_timeout, false));
        // The database lives only as long as its connection, so it must never
        // be reaped or recycled.
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager);

        finish_open(pool, "memory", started_at)
    }

    /// Checks out one connection for the duration of a single operation.
    pub(crate) fn connection(&self) -> DbResult<PooledConn> {
        Ok(self.pool.get()?)
    }

    /// Returns the applied schema version.
    pub fn schema_version(&self) -> DbResult<u32> {
        let conn = self.connection()?;
        let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        Ok(version)
    }

    /// Returns whether a table with the given name exists.
    pub fn has_table(&self, table: &str) -> DbResult<bool> {
        let conn = self.connection()?;
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn finish_open(
    pool: Result<Pool<SqliteConnectionManager>, r2d2::Error>,
    mode: &'static str,
    started_at: Instant,
) -> DbResult<Store> {
    let pool = match pool {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={} duration_ms={} error_code=pool_build_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    let store = Store { pool };
    match migrate(&store) {
        Ok(()) => {
            info!(
                "event=store_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(store)
        }
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn migrate(store: &Store) -> DbResult<()> {
    let mut conn = store.connection()?;
    apply_migrations(&mut conn)
}

fn configure_connection(
    conn: &mut Connection,
    busy_timeout: Duration,
    write_ahead_log: bool,
) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    if write_ahead_log {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    }
    Ok(())
}
