//! Fixed-reply completion service for tests and offline runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{CompletionRequest, CompletionService};
use crate::error::{EngramError, Result};

pub struct StaticCompletion {
    outcome: std::result::Result<String, String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl StaticCompletion {
    /// Always answer with `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Self::with_outcome(Ok(text.into()))
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Err(message.into()))
    }

    fn with_outcome(outcome: std::result::Result<String, String>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request seen.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl CompletionService for StaticCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
        match &self.outcome {
            Ok(text) if !text.trim().is_empty() => Ok(text.clone()),
            Ok(_) => Err(EngramError::completion("empty completion")),
            Err(msg) => Err(EngramError::completion(msg)),
        }
    }

    fn model(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_requests() {
        let stub = StaticCompletion::reply("story");
        let out = stub.complete(&CompletionRequest::new("p1")).await.unwrap();
        assert_eq!(out, "story");
        assert_eq!(stub.calls(), 1);
        assert_eq!(stub.last_request().unwrap().prompt, "p1");
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let stub = StaticCompletion::reply("   ");
        let err = stub.complete(&CompletionRequest::new("p")).await.unwrap_err();
        assert!(matches!(err, EngramError::Completion(_)));
    }

    #[tokio::test]
    async fn failing_stub_fails() {
        let stub = StaticCompletion::failing("boom");
        let err = stub.complete(&CompletionRequest::new("p")).await.unwrap_err();
        assert_eq!(err.to_string(), "completion service error: boom");
    }
}
