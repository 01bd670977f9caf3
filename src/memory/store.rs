//! Memory store: append and list consolidated memories.
//!
//! [`add_memory`] inserts the row and syncs the FTS5 index inside one
//! transaction. Listing returns rows in storage (insertion) order; no other
//! ordering is promised.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{from_json_column, to_json_text, EngramError, Result};
use crate::fragment::Metadata;
use crate::memory::types::Memory;

pub(crate) const MEMORY_COLUMNS: &str =
    "m.id, m.text, m.created_at, m.embedding, m.source, m.fragments, m.metadata";

/// Filters for [`list_memories`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Exact match on `source`.
    pub source: Option<String>,
    pub limit: Option<usize>,
}

/// Persist a memory. The id must already be assigned (see [`Memory::new`]).
pub fn add_memory(conn: &mut Connection, memory: &Memory) -> Result<()> {
    if memory.id.is_empty() {
        return Err(EngramError::validation("memory id must be assigned before storing"));
    }
    if memory.text.trim().is_empty() {
        return Err(EngramError::validation("memory text must not be empty"));
    }

    let embedding_json = memory.embedding.as_ref().map(to_json_text).transpose()?;
    let fragments_json = to_json_text(&memory.fragments)?;
    let metadata_json = to_json_text(&memory.metadata)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO memories (id, text, created_at, embedding, source, fragments, metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            memory.id,
            memory.text,
            memory.created_at,
            embedding_json,
            memory.source,
            fragments_json,
            metadata_json,
        ],
    )?;
    let rowid = tx.last_insert_rowid();

    // FTS5 external content must share the memories rowid
    tx.execute(
        "INSERT INTO memories_fts (rowid, text, id) VALUES (?1, ?2, ?3)",
        params![rowid, memory.text, memory.id],
    )?;
    tx.commit()?;

    tracing::info!(
        id = %memory.id,
        source = %memory.source,
        fragments = memory.fragments.len(),
        "memory stored"
    );
    Ok(())
}

pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<Memory>> {
    let memory = conn
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories m WHERE m.id = ?1"),
            params![id],
            memory_from_row,
        )
        .optional()?;
    Ok(memory)
}

/// Memories in storage order, optionally filtered by source and capped.
pub fn list_memories(conn: &Connection, filter: &MemoryFilter) -> Result<Vec<Memory>> {
    let mut sql = format!("SELECT {MEMORY_COLUMNS} FROM memories m");
    let mut values: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(ref source) = filter.source {
        sql.push_str(" WHERE m.source = ?");
        values.push(source.clone().into());
    }
    sql.push_str(" ORDER BY m.rowid");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        values.push((limit as i64).into());
    }

    let mut stmt = conn.prepare(&sql)?;
    let memories = stmt
        .query_map(params_from_iter(values), memory_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(memories)
}

pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let embedding: Option<String> = row.get(3)?;
    let fragments: String = row.get(5)?;
    let metadata: Option<String> = row.get(6)?;
    Ok(Memory {
        id: row.get(0)?,
        text: row.get(1)?,
        created_at: row.get(2)?,
        embedding: embedding
            .map(|text| from_json_column(3, &text))
            .transpose()?,
        source: row.get(4)?,
        fragments: from_json_column(5, &fragments)?,
        metadata: match metadata {
            Some(text) => from_json_column(6, &text)?,
            None => Metadata::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(text: &str, source: &str) -> Memory {
        Memory::new(text, source, vec!["a".into(), "b".into()], Metadata::new())
    }

    #[test]
    fn add_and_get_round_trips_fields() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let mut meta = Metadata::new();
        meta.insert("fragment_count".into(), serde_json::json!(2));
        let m = Memory::new("A day at the lake", "test", vec!["lake".into(), "sun".into()], meta);

        add_memory(&mut conn, &m).unwrap();
        let loaded = get_memory(&conn, &m.id).unwrap().unwrap();
        assert_eq!(loaded, m);
    }

    #[test]
    fn duplicate_id_is_a_storage_error() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let m = memory("once", "test");
        add_memory(&mut conn, &m).unwrap();
        let err = add_memory(&mut conn, &m).unwrap_err();
        assert!(matches!(err, EngramError::Storage(_)));
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let err = add_memory(&mut conn, &memory("  ", "test")).unwrap_err();
        assert!(matches!(err, EngramError::Validation(_)));
    }

    #[test]
    fn list_filters_by_source_in_storage_order() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let first = memory("first", "cli");
        let second = memory("second", "web");
        let third = memory("third", "cli");
        for m in [&first, &second, &third] {
            add_memory(&mut conn, m).unwrap();
        }

        let all = list_memories(&conn, &MemoryFilter::default()).unwrap();
        let texts: Vec<&str> = all.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);

        let cli = list_memories(
            &conn,
            &MemoryFilter {
                source: Some("cli".into()),
                limit: Some(1),
            },
        )
        .unwrap();
        assert_eq!(cli.len(), 1);
        assert_eq!(cli[0].id, first.id);
    }
}
