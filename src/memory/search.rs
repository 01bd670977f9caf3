//! Memory search strategies.
//!
//! [`MemorySearch`] is the single search capability; [`SubstringSearch`] is the
//! naive case-insensitive fallback and [`FtsSearch`] ranks keyword matches with
//! the FTS5 index. A vector index would slot in behind the same trait. The
//! strategy is picked once from configuration via [`create_search`].

use rusqlite::{params, Connection};
use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{EngramError, Result};
use crate::memory::store::{list_memories, memory_from_row, MemoryFilter, MEMORY_COLUMNS};
use crate::memory::types::Memory;

pub trait MemorySearch: Send + Sync {
    /// Up to `top_k` memories relevant to `query`.
    fn search(&self, conn: &Connection, query: &str, top_k: usize) -> Result<Vec<Memory>>;

    /// Strategy name as used in configuration.
    fn name(&self) -> &'static str;
}

fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(EngramError::validation("search query must not be empty"));
    }
    Ok(query)
}

/// Case-insensitive substring match on memory text, first `top_k` in store order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringSearch;

impl MemorySearch for SubstringSearch {
    fn search(&self, conn: &Connection, query: &str, top_k: usize) -> Result<Vec<Memory>> {
        let needle = validate_query(query)?.to_lowercase();
        if top_k == 0 {
            return Ok(Vec::new());
        }

        // Lowercasing happens here rather than in SQL, whose lower() is ASCII-only
        let matches = list_memories(conn, &MemoryFilter::default())?
            .into_iter()
            .filter(|m| m.text.to_lowercase().contains(&needle))
            .take(top_k)
            .collect();
        Ok(matches)
    }

    fn name(&self) -> &'static str {
        "substring"
    }
}

/// BM25-ranked keyword search over the `memories_fts` index.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtsSearch;

/// Quote every term so user input is never parsed as FTS5 syntax.
fn fts_match_expression(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

impl MemorySearch for FtsSearch {
    fn search(&self, conn: &Connection, query: &str, top_k: usize) -> Result<Vec<Memory>> {
        let query = validate_query(query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories_fts \
             JOIN memories m ON m.rowid = memories_fts.rowid \
             WHERE memories_fts MATCH ?1 ORDER BY memories_fts.rank LIMIT ?2"
        ))?;
        let memories = stmt
            .query_map(
                params![fts_match_expression(query), top_k as i64],
                memory_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(memories)
    }

    fn name(&self) -> &'static str {
        "fts"
    }
}

/// Create the search strategy named by `config.strategy`.
pub fn create_search(config: &RetrievalConfig) -> anyhow::Result<Arc<dyn MemorySearch>> {
    match config.strategy.as_str() {
        "substring" => Ok(Arc::new(SubstringSearch)),
        "fts" => Ok(Arc::new(FtsSearch)),
        other => anyhow::bail!("unknown search strategy: {other}. Supported: substring, fts"),
    }
}
