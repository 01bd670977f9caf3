//! Session store: named groupings that fragments link into.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::now_timestamp;
use crate::error::{from_json_column, to_json_text, Result};
use crate::fragment::types::{Metadata, Session};

/// Create a session and return its id. Sessions are never mutated afterwards.
pub fn create_session(
    conn: &Connection,
    name: Option<&str>,
    metadata: Option<&Metadata>,
) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let metadata_json = to_json_text(&metadata.cloned().unwrap_or_default())?;

    conn.execute(
        "INSERT INTO sessions (id, name, created_at, metadata) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, now_timestamp(), metadata_json],
    )?;

    tracing::info!(id = %id, name = ?name, "session created");
    Ok(id)
}

/// All sessions, newest first.
pub fn list_sessions(conn: &Connection) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, metadata FROM sessions ORDER BY created_at DESC, rowid DESC",
    )?;
    let sessions = stmt
        .query_map([], session_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sessions)
}

pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            "SELECT id, name, created_at, metadata FROM sessions WHERE id = ?1",
            params![id],
            session_from_row,
        )
        .optional()?;
    Ok(session)
}

pub fn session_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sessions WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let metadata: Option<String> = row.get(3)?;
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        metadata: match metadata {
            Some(text) => from_json_column(3, &text)?,
            None => Metadata::new(),
        },
    })
}
