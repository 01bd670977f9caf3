//! Segment raw input and persist every resulting fragment in one transaction.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{EngramError, Result};
use crate::fragment::segment::segment;
use crate::fragment::session::session_exists;
use crate::fragment::store::insert_fragment;

/// Outcome of an ingest call.
#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub fragments_added: usize,
    /// Ids in the same order as `fragments`.
    pub fragment_ids: Vec<String>,
    pub fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Segment `text` and store each fragment under `source`.
///
/// Empty text is a validation error, and so is text that segments to nothing.
pub fn ingest_text(
    conn: &mut Connection,
    text: &str,
    source: &str,
    session_id: Option<&str>,
) -> Result<IngestResult> {
    if text.trim().is_empty() {
        return Err(EngramError::validation("text must not be empty"));
    }

    let fragments = segment(text);
    if fragments.is_empty() {
        return Err(EngramError::validation(
            "no fragments could be extracted from input",
        ));
    }

    let tx = conn.transaction()?;
    if let Some(sid) = session_id {
        if !session_exists(&tx, sid)? {
            return Err(EngramError::not_found("session", sid));
        }
    }

    let mut fragment_ids = Vec::with_capacity(fragments.len());
    for content in &fragments {
        fragment_ids.push(insert_fragment(&tx, content, source, None, session_id)?);
    }
    tx.commit()?;

    tracing::info!(
        count = fragments.len(),
        source = %source,
        session = ?session_id,
        "fragments ingested"
    );

    Ok(IngestResult {
        fragments_added: fragments.len(),
        fragment_ids,
        fragments,
        filename: None,
    })
}

/// Ingest the contents of an uploaded file; fragments get source `file:<filename>`.
pub fn ingest_file(
    conn: &mut Connection,
    content: &str,
    filename: &str,
    session_id: Option<&str>,
) -> Result<IngestResult> {
    if filename.trim().is_empty() {
        return Err(EngramError::validation("filename must not be empty"));
    }
    let source = format!("file:{filename}");
    let mut result = ingest_text(conn, content, &source, session_id).map_err(|e| match e {
        EngramError::Validation(_) => {
            EngramError::validation("no fragments could be extracted from file")
        }
        other => other,
    })?;
    result.filename = Some(filename.to_string());
    Ok(result)
}
