//! Error kinds surfaced by the fragment and memory core.
//!
//! Every fallible core operation returns [`EngramError`]. Callers (the HTTP and
//! CLI layers) translate variants into envelopes or terminal messages; the core
//! never renders them itself.

use thiserror::Error;

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, EngramError>;

#[derive(Debug, Error)]
pub enum EngramError {
    /// Empty or missing required input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced session, fragment, or memory does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// None of the supplied fragment ids resolved.
    #[error("no fragments found")]
    NoFragmentsFound,

    /// The completion service failed, timed out, or returned unusable output.
    #[error("completion service error: {0}")]
    Completion(String),

    /// Underlying SQLite failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl EngramError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn completion(msg: impl std::fmt::Display) -> Self {
        Self::Completion(msg.to_string())
    }

    /// HTTP status code a caller should attach to this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } | Self::NoFragmentsFound => 404,
            Self::Completion(_) | Self::Storage(_) | Self::Task(_) => 500,
        }
    }
}

/// Encode a JSON value for a TEXT column.
pub(crate) fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| EngramError::Storage(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

/// Decode a JSON TEXT column inside a row mapper.
pub(crate) fn from_json_column<T: serde::de::DeserializeOwned>(
    idx: usize,
    text: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(EngramError::validation("empty text").status_code(), 400);
        assert_eq!(EngramError::not_found("session", "abc").status_code(), 404);
        assert_eq!(EngramError::NoFragmentsFound.status_code(), 404);
        assert_eq!(EngramError::completion("timeout").status_code(), 500);
        assert_eq!(EngramError::Task("cancelled".into()).status_code(), 500);
    }

    #[test]
    fn not_found_message_names_the_kind() {
        let err = EngramError::not_found("session", "abc");
        assert_eq!(err.to_string(), "session not found: abc");
    }
}
