pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The process-wide connection, created once at startup and passed to every
/// component that touches storage.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Lock the shared connection. A poisoned lock is recovered: any transaction the
/// panicking holder had open was rolled back when it was dropped.
pub fn lock(db: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run storage work on the blocking pool with the shared connection locked.
///
/// SQLite calls never run on an async worker thread; everything async that
/// touches the database goes through here.
pub async fn run_blocking<T, F>(db: &SharedConnection, f: F) -> crate::error::Result<T>
where
    F: FnOnce(&mut Connection) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || {
        let mut conn = lock(&db);
        f(&mut conn)
    })
    .await
    .map_err(|e| crate::error::EngramError::Task(e.to_string()))?
}

/// Current UTC time as a fixed-width RFC 3339 string, so stored timestamps
/// sort lexically in chronological order.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Open (or create) the Engram database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL lets list() readers run alongside a writer
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open a fully migrated in-memory database.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub fragment_count: u64,
    pub session_count: u64,
    pub memory_count: u64,
}

/// Run `PRAGMA integrity_check` and gather row counts.
pub fn check_database_health(conn: &Connection) -> rusqlite::Result<HealthReport> {
    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let schema_version = migrations::get_schema_version(conn)?;

    let count = |table: &str| -> rusqlite::Result<u64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
    };

    Ok(HealthReport {
        integrity_ok: integrity_details == "ok",
        integrity_details,
        schema_version,
        fragment_count: count("fragments")?,
        session_count: count("sessions")?,
        memory_count: count("memories")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngramError;

    fn shared() -> SharedConnection {
        Arc::new(Mutex::new(open_memory_database().unwrap()))
    }

    #[tokio::test]
    async fn run_blocking_executes_off_the_async_worker() {
        let db = shared();
        let caller = std::thread::current().id();
        let worker = run_blocking(&db, |conn| {
            conn.execute_batch("CREATE TABLE scratch (n INTEGER)")?;
            Ok(std::thread::current().id())
        })
        .await
        .unwrap();
        assert_ne!(worker, caller);

        let exists: bool = lock(&db)
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE name = 'scratch'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(exists);
    }

    #[tokio::test]
    async fn run_blocking_surfaces_storage_errors() {
        let db = shared();
        let err = run_blocking(&db, |conn| {
            conn.execute("INSERT INTO missing_table VALUES (1)", [])?;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EngramError::Storage(_)));
    }

    #[tokio::test]
    async fn run_blocking_reports_panicked_task() {
        let db = shared();
        let err = run_blocking(&db, |_conn| -> crate::error::Result<()> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, EngramError::Task(_)));

        // The poisoned lock is recovered for the next caller
        assert!(run_blocking(&db, |conn| Ok(conn.is_autocommit())).await.unwrap());
    }
}
