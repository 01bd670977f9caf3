//! Answer natural-language questions from stored memories.

use std::sync::Arc;

use crate::completion::{CompletionRequest, CompletionService};
use crate::db::{run_blocking, SharedConnection};
use crate::error::{EngramError, Result};
use crate::memory::search::MemorySearch;

/// Memories pulled into the answer context.
pub const ANSWER_CONTEXT_SIZE: usize = 5;

pub const NO_MEMORIES_REPLY: &str = "I don't have any memories related to that question.";

fn answer_prompt(question: &str, memory_texts: &[&str]) -> String {
    let context = memory_texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Memory {}: {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on these memories, answer the following question:\n\n\
         Question: {question}\n\n\
         Relevant memories:\n{context}\n\n\
         Answer:"
    )
}

/// Search for memories relevant to `question` and have the completion service
/// answer from them. Returns [`NO_MEMORIES_REPLY`] without calling the service
/// when nothing matches.
pub async fn answer(
    db: &SharedConnection,
    search: &Arc<dyn MemorySearch>,
    completion: &dyn CompletionService,
    question: &str,
) -> Result<String> {
    if question.trim().is_empty() {
        return Err(EngramError::validation("question must not be empty"));
    }

    let strategy = Arc::clone(search);
    let query = question.to_string();
    let memories = run_blocking(db, move |conn| {
        strategy.search(conn, &query, ANSWER_CONTEXT_SIZE)
    })
    .await?;
    tracing::debug!(question = %question, matches = memories.len(), "answering from memories");

    if memories.is_empty() {
        return Ok(NO_MEMORIES_REPLY.to_string());
    }

    let texts: Vec<&str> = memories.iter().map(|m| m.text.as_str()).collect();
    let request = CompletionRequest::new(answer_prompt(question, &texts))
        .with_max_tokens(200)
        .with_temperature(0.7);
    completion.complete(&request).await
}
