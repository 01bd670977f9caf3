//! SQL DDL for all Engram tables.
//!
//! Defines the `fragments`, `sessions`, `fragment_sessions`, `memories`,
//! `memories_fts` (FTS5), and `schema_meta` tables. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Raw text units awaiting consolidation
CREATE TABLE IF NOT EXISTS fragments (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL CHECK(length(trim(content)) > 0),
    source TEXT NOT NULL,
    created_at TEXT NOT NULL,
    metadata TEXT,
    processed INTEGER NOT NULL DEFAULT 0 CHECK(processed IN (0, 1)),
    memory_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_fragments_created ON fragments(created_at);
CREATE INDEX IF NOT EXISTS idx_fragments_processed ON fragments(processed);

-- Caller-defined groupings
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    name TEXT,
    created_at TEXT NOT NULL,
    metadata TEXT
);

CREATE TABLE IF NOT EXISTS fragment_sessions (
    fragment_id TEXT NOT NULL REFERENCES fragments(id),
    session_id TEXT NOT NULL REFERENCES sessions(id),
    PRIMARY KEY (fragment_id, session_id)
);

CREATE INDEX IF NOT EXISTS idx_fragment_sessions_session ON fragment_sessions(session_id);

-- Consolidated narratives
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    created_at TEXT NOT NULL,
    embedding TEXT,
    source TEXT NOT NULL,
    fragments TEXT NOT NULL,
    metadata TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_source ON memories(source);

-- Keyword index over memory text
CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts USING fts5(
    text,
    id UNINDEXED,
    content='memories',
    content_rowid='rowid'
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
