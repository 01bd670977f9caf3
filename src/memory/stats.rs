use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

/// Counts across the fragment, session, and memory tables.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_fragments: u64,
    pub processed_fragments: u64,
    pub unprocessed_fragments: u64,
    pub sessions: u64,
    pub memories: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_fragment: Option<String>,
}

pub fn collect_stats(conn: &Connection) -> Result<StatsResponse> {
    let (total, processed): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(processed), 0) FROM fragments",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let sessions: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    let memories: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
    let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM fragments",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(StatsResponse {
        total_fragments: total as u64,
        processed_fragments: processed as u64,
        unprocessed_fragments: (total - processed) as u64,
        sessions: sessions as u64,
        memories: memories as u64,
        oldest_fragment: oldest,
        newest_fragment: newest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::store::{create_fragment, mark_processed};

    #[test]
    fn empty_database_has_zero_counts() {
        let conn = crate::db::open_memory_database().unwrap();
        let stats = collect_stats(&conn).unwrap();
        assert_eq!(stats.total_fragments, 0);
        assert_eq!(stats.processed_fragments, 0);
        assert!(stats.oldest_fragment.is_none());
    }

    #[test]
    fn processed_split_is_counted() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let a = create_fragment(&mut conn, "one two", "cli", None, None).unwrap();
        create_fragment(&mut conn, "three four", "cli", None, None).unwrap();
        mark_processed(&mut conn, &[a], "m1").unwrap();

        let stats = collect_stats(&conn).unwrap();
        assert_eq!(stats.total_fragments, 2);
        assert_eq!(stats.processed_fragments, 1);
        assert_eq!(stats.unprocessed_fragments, 1);
    }
}
