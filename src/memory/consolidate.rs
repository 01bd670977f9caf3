//! Consolidation: turn selected fragments into one memory via the completion service.
//!
//! [`Consolidator::consolidate`] runs: resolve ids → prompt → complete → store
//! memory → mark fragments processed. The completion call happens with no
//! database lock held and before anything is written, so a failed completion
//! leaves both stores untouched.
//!
//! Storing the memory and marking its fragments are two separate transactions.
//! If the process dies between them the memory exists while its fragments are
//! still unprocessed; each fragment row stays internally consistent either way.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::completion::{CompletionRequest, CompletionService, DEFAULT_MAX_TOKENS};
use crate::config::CompletionConfig;
use crate::db::{run_blocking, SharedConnection};
use crate::error::{EngramError, Result};
use crate::fragment::store::{mark_processed, resolve_fragments};
use crate::fragment::Metadata;
use crate::memory::store::add_memory;
use crate::memory::types::Memory;

/// Provenance tag for memories built from stored fragments.
pub const CONSOLIDATION_SOURCE: &str = "fragment_consolidation";

const JOURNAL_SYSTEM_MESSAGE: &str = "You are helping build memories from fragments of text. \
Try to infer what the user is writing about. Then, complete the thoughts so they are full sentences. \
Your task is add text to make the fragments the user provides seem like a complete journal entry. \
Do not add any new details but try to add words so there is clarity.";

/// Prompt asking the model to weave fragments into a single story.
pub fn consolidation_prompt(contents: &[String]) -> String {
    format!(
        "You are an assistant that helps users log memories. \
         Given the following unordered words or fragments, reconstruct a coherent, embellished memory or story. \
         Fragments: {}\nMemory: ",
        contents.join(", ")
    )
}

/// Outcome of [`Consolidator::consolidate`].
#[derive(Debug, Serialize)]
pub struct ConsolidationResult {
    pub memory: Memory,
    /// Fragments that resolved and went into the memory.
    pub processed_fragments: usize,
    /// Fragments whose state flipped to processed; lower than
    /// `processed_fragments` when some were already consumed elsewhere.
    pub newly_marked: usize,
}

pub struct Consolidator {
    db: SharedConnection,
    completion: Arc<dyn CompletionService>,
    max_tokens: u32,
    temperature: f32,
}

impl Consolidator {
    pub fn new(
        db: SharedConnection,
        completion: Arc<dyn CompletionService>,
        config: &CompletionConfig,
    ) -> Self {
        Self {
            db,
            completion,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    pub fn completion(&self) -> &Arc<dyn CompletionService> {
        &self.completion
    }

    /// Consolidate stored fragments into a new memory.
    ///
    /// Ids that do not resolve are dropped; if none resolve the call fails with
    /// [`EngramError::NoFragmentsFound`] and nothing is written. `session_id` is
    /// recorded in the memory metadata only.
    pub async fn consolidate(
        &self,
        fragment_ids: &[String],
        session_id: Option<&str>,
    ) -> Result<ConsolidationResult> {
        if fragment_ids.is_empty() {
            return Err(EngramError::NoFragmentsFound);
        }

        let requested = fragment_ids.to_vec();
        let fragments =
            run_blocking(&self.db, move |conn| resolve_fragments(conn, &requested)).await?;
        if fragments.is_empty() {
            tracing::warn!(requested = fragment_ids.len(), "no fragment ids resolved");
            return Err(EngramError::NoFragmentsFound);
        }

        let contents: Vec<String> = fragments.iter().map(|f| f.content.clone()).collect();
        let resolved_ids: Vec<String> = fragments.into_iter().map(|f| f.id).collect();

        tracing::info!(
            requested = fragment_ids.len(),
            resolved = resolved_ids.len(),
            session = ?session_id,
            "consolidating fragments"
        );

        let request = CompletionRequest::new(consolidation_prompt(&contents))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        let text = self.completion.complete(&request).await?;

        let mut metadata = Metadata::new();
        metadata.insert("session_id".into(), json!(session_id));
        metadata.insert("fragment_count".into(), json!(contents.len()));
        metadata.insert("original_fragment_ids".into(), json!(fragment_ids));

        let memory = Memory::new(text, CONSOLIDATION_SOURCE, contents, metadata);

        let stored = memory.clone();
        run_blocking(&self.db, move |conn| add_memory(conn, &stored)).await?;

        let to_mark = resolved_ids.clone();
        let memory_id = memory.id.clone();
        let newly_marked = run_blocking(&self.db, move |conn| {
            mark_processed(conn, &to_mark, &memory_id)
        })
        .await
        .inspect_err(|e| {
            tracing::error!(
                memory_id = %memory.id,
                error = %e,
                "memory stored but fragments were not marked processed"
            );
        })?;

        tracing::info!(
            memory_id = %memory.id,
            fragments = resolved_ids.len(),
            newly_marked,
            "consolidation complete"
        );

        Ok(ConsolidationResult {
            memory,
            processed_fragments: resolved_ids.len(),
            newly_marked,
        })
    }

    /// Build and store a memory straight from fragment strings, bypassing the
    /// fragment store.
    pub async fn compose(
        &self,
        fragments: Vec<String>,
        source: &str,
        metadata: Metadata,
    ) -> Result<Memory> {
        let fragments: Vec<String> = fragments
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        if fragments.is_empty() {
            return Err(EngramError::validation("fragments must be a non-empty list"));
        }

        let request = CompletionRequest::new(consolidation_prompt(&fragments))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);
        let text = self.completion.complete(&request).await?;

        let memory = Memory::new(text, source, fragments, metadata);
        let stored = memory.clone();
        run_blocking(&self.db, move |conn| add_memory(conn, &stored)).await?;
        Ok(memory)
    }

    /// Expand rough notes into a journal-style entry. Nothing is stored.
    pub async fn build(&self, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(EngramError::validation("content must not be empty"));
        }
        let request = CompletionRequest::new(format!("Text to build into memory:\n{content}"))
            .with_system_message(JOURNAL_SYSTEM_MESSAGE)
            .with_max_tokens(DEFAULT_MAX_TOKENS)
            .with_temperature(self.temperature);
        self.completion.complete(&request).await
    }
}
