//! Consolidated memory record.

use serde::{Deserialize, Serialize};

use crate::fragment::Metadata;

/// A narrative built from one or more fragments, matching the `memories` table.
/// Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 primary key, assigned by [`Memory::new`].
    pub id: String,
    /// Text produced by the completion service.
    pub text: String,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
    /// Reserved for a vector index; never computed by this crate.
    pub embedding: Option<Vec<f32>>,
    /// Provenance tag, e.g. `"fragment_consolidation"`.
    pub source: String,
    /// Fragment contents the memory was built from, in prompt order.
    pub fragments: Vec<String>,
    /// Session reference, fragment count, original fragment ids, and caller data.
    pub metadata: Metadata,
}

impl Memory {
    /// Build an unsaved memory with a fresh id and timestamp.
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        fragments: Vec<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            text: text.into(),
            created_at: crate::db::now_timestamp(),
            embedding: None,
            source: source.into(),
            fragments,
            metadata,
        }
    }
}
