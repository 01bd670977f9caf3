//! Fragment store: creation, filtered listing, session linking, and the
//! processed/memory_id transition.
//!
//! A fragment's `processed` flag and `memory_id` always change together in a
//! single UPDATE, and [`mark_processed`] applies a whole batch inside one
//! transaction so readers never see a partially marked set.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::now_timestamp;
use crate::error::{from_json_column, to_json_text, EngramError, Result};
use crate::fragment::session::session_exists;
use crate::fragment::types::{Fragment, Metadata};

const FRAGMENT_COLUMNS: &str = "f.id, f.content, f.source, f.created_at, f.metadata, f.processed, f.memory_id";

/// Filters for [`list_fragments`]. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct FragmentFilter {
    /// Only fragments linked to this session.
    pub session_id: Option<String>,
    /// Exact match on the processed flag.
    pub processed: Option<bool>,
    /// Cap on the number of rows returned.
    pub limit: Option<usize>,
}

/// Persist one fragment and optionally link it to a session. Returns the new id.
///
/// Fails with [`EngramError::NotFound`] if `session_id` names no session.
pub fn create_fragment(
    conn: &mut Connection,
    content: &str,
    source: &str,
    metadata: Option<&Metadata>,
    session_id: Option<&str>,
) -> Result<String> {
    let tx = conn.transaction()?;
    if let Some(sid) = session_id {
        if !session_exists(&tx, sid)? {
            return Err(EngramError::not_found("session", sid));
        }
    }
    let id = insert_fragment(&tx, content, source, metadata, session_id)?;
    tx.commit()?;

    tracing::debug!(id = %id, source = %source, "fragment created");
    Ok(id)
}

/// Insert a fragment row (and session link) on an open connection or transaction.
/// The caller has already checked that the session exists.
pub(crate) fn insert_fragment(
    conn: &Connection,
    content: &str,
    source: &str,
    metadata: Option<&Metadata>,
    session_id: Option<&str>,
) -> Result<String> {
    if content.trim().is_empty() {
        return Err(EngramError::validation("fragment content must not be empty"));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let metadata_json = to_json_text(&metadata.cloned().unwrap_or_default())?;

    conn.execute(
        "INSERT INTO fragments (id, content, source, created_at, metadata, processed, memory_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL)",
        params![id, content, source, now_timestamp(), metadata_json],
    )?;

    if let Some(sid) = session_id {
        insert_link(conn, &id, sid)?;
    }

    Ok(id)
}

fn insert_link(conn: &Connection, fragment_id: &str, session_id: &str) -> Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO fragment_sessions (fragment_id, session_id) VALUES (?1, ?2)",
        params![fragment_id, session_id],
    )?;
    Ok(rows > 0)
}

/// Link an existing fragment to an existing session. Idempotent: returns
/// `false` when the link was already present.
pub fn link_to_session(conn: &Connection, fragment_id: &str, session_id: &str) -> Result<bool> {
    if get_fragment(conn, fragment_id)?.is_none() {
        return Err(EngramError::not_found("fragment", fragment_id));
    }
    if !session_exists(conn, session_id)? {
        return Err(EngramError::not_found("session", session_id));
    }
    insert_link(conn, fragment_id, session_id)
}

/// Session ids a fragment is linked to.
pub fn sessions_for_fragment(conn: &Connection, fragment_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT session_id FROM fragment_sessions WHERE fragment_id = ?1 ORDER BY session_id",
    )?;
    let ids = stmt
        .query_map(params![fragment_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

pub fn get_fragment(conn: &Connection, id: &str) -> Result<Option<Fragment>> {
    let fragment = conn
        .query_row(
            &format!("SELECT {FRAGMENT_COLUMNS} FROM fragments f WHERE f.id = ?1"),
            params![id],
            fragment_from_row,
        )
        .optional()?;
    Ok(fragment)
}

/// Resolve ids in caller order. Unknown ids are dropped; duplicates resolve once.
pub fn resolve_fragments(conn: &Connection, ids: &[String]) -> Result<Vec<Fragment>> {
    let mut seen = std::collections::HashSet::new();
    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        match get_fragment(conn, id)? {
            Some(fragment) => resolved.push(fragment),
            None => tracing::debug!(id = %id, "fragment id did not resolve, skipping"),
        }
    }
    Ok(resolved)
}

/// List fragments newest-first, filtered by session and/or processed state.
pub fn list_fragments(conn: &Connection, filter: &FragmentFilter) -> Result<Vec<Fragment>> {
    let mut sql = format!("SELECT {FRAGMENT_COLUMNS} FROM fragments f");
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(ref sid) = filter.session_id {
        sql.push_str(" JOIN fragment_sessions fs ON fs.fragment_id = f.id");
        conditions.push("fs.session_id = ?");
        values.push(sid.clone().into());
    }
    if let Some(processed) = filter.processed {
        conditions.push("f.processed = ?");
        values.push(i64::from(processed).into());
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY f.created_at DESC, f.rowid DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        values.push((limit as i64).into());
    }

    let mut stmt = conn.prepare(&sql)?;
    let fragments = stmt
        .query_map(params_from_iter(values), fragment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(fragments)
}

/// Mark fragments as consumed by `memory_id`.
///
/// Runs in one transaction. Unknown ids are skipped, and fragments that are
/// already processed keep their original `memory_id` (first consolidation
/// wins). Returns the number of fragments that changed state.
pub fn mark_processed(conn: &mut Connection, ids: &[String], memory_id: &str) -> Result<usize> {
    if memory_id.is_empty() {
        return Err(EngramError::validation("memory_id must not be empty"));
    }

    let tx = conn.transaction()?;
    let mut updated = 0;
    {
        let mut stmt = tx.prepare(
            "UPDATE fragments SET processed = 1, memory_id = ?1 WHERE id = ?2 AND processed = 0",
        )?;
        for id in ids {
            updated += stmt.execute(params![memory_id, id])?;
        }
    }
    tx.commit()?;

    if updated < ids.len() {
        tracing::debug!(
            requested = ids.len(),
            updated,
            memory_id = %memory_id,
            "some fragments were unknown or already processed"
        );
    }
    Ok(updated)
}

fn fragment_from_row(row: &Row<'_>) -> rusqlite::Result<Fragment> {
    let metadata: Option<String> = row.get(4)?;
    Ok(Fragment {
        id: row.get(0)?,
        content: row.get(1)?,
        source: row.get(2)?,
        created_at: row.get(3)?,
        metadata: match metadata {
            Some(text) => from_json_column(4, &text)?,
            None => Metadata::new(),
        },
        processed: row.get(5)?,
        memory_id: row.get(6)?,
    })
}
