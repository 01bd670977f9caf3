//! Fragment and session records.

use serde::{Deserialize, Serialize};

/// Open key-value map stored as JSON text.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A minimal unit of raw user text, matching the `fragments` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// UUID v7 primary key.
    pub id: String,
    pub content: String,
    /// Provenance tag, e.g. `"web_input"`, `"file:notes.txt"`, `"cli"`.
    pub source: String,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
    pub metadata: Metadata,
    /// Flips to `true` exactly once, together with `memory_id`.
    pub processed: bool,
    /// The memory that consumed this fragment.
    pub memory_id: Option<String>,
}

/// A caller-defined grouping of fragments, matching the `sessions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: Option<String>,
    pub created_at: String,
    pub metadata: Metadata,
}
