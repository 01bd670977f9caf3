//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `schema_meta` and runs sequential migrations
//! to bring the database up to [`CURRENT_SCHEMA_VERSION`].

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE schema_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Run any pending forward-only migrations. Each migration runs in a transaction.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(schema_version = version, target = CURRENT_SCHEMA_VERSION, "checking migrations");

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        conn.execute_batch("BEGIN")?;
        let step = match next {
            2 => migrate_v1_to_v2(conn),
            _ => {
                tracing::error!(version = next, "unknown migration target");
                conn.execute_batch("ROLLBACK")?;
                break;
            }
        };
        if let Err(e) = step.and_then(|_| update_schema_version(conn, next)) {
            conn.execute_batch("ROLLBACK")?;
            return Err(e);
        }
        conn.execute_batch("COMMIT")?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: guard the processed/memory_id pairing with triggers.
///
/// `processed` may only move from 0 to 1, and only together with a non-null
/// `memory_id`; an unprocessed row never carries a `memory_id`.
///
/// Rows written before the guard existed are repaired first: a row bound to a
/// memory counts as processed, and a row flagged processed with no memory goes
/// back to unprocessed so it can still be consolidated.
fn migrate_v1_to_v2(conn: &Connection) -> rusqlite::Result<()> {
    let bound = conn.execute(
        "UPDATE fragments SET processed = 1 WHERE processed = 0 AND memory_id IS NOT NULL",
        [],
    )?;
    let unbound = conn.execute(
        "UPDATE fragments SET processed = 0 WHERE processed = 1 AND memory_id IS NULL",
        [],
    )?;
    if bound + unbound > 0 {
        tracing::warn!(bound, unbound, "repaired inconsistent fragment rows");
    }

    conn.execute_batch(
        r#"
CREATE TRIGGER IF NOT EXISTS fragments_state_insert
BEFORE INSERT ON fragments
WHEN (NEW.processed = 1) != (NEW.memory_id IS NOT NULL)
BEGIN
    SELECT RAISE(ABORT, 'fragment processed flag and memory_id must agree');
END;

CREATE TRIGGER IF NOT EXISTS fragments_state_update
BEFORE UPDATE OF processed, memory_id ON fragments
WHEN (NEW.processed = 1) != (NEW.memory_id IS NOT NULL)
    OR (OLD.processed = 1 AND NEW.processed = 0)
BEGIN
    SELECT RAISE(ABORT, 'fragment processed flag and memory_id must agree');
END;
"#,
    )
}
