pub mod doctor;
pub mod fragments;
pub mod memories;
pub mod search;
pub mod sessions;
pub mod stats;

use anyhow::{Context, Result};

use engram::completion::{self, CompletionRequest};
use engram::config::EngramConfig;

const PROBE_PROMPT: &str = "Reply with one short sentence confirming you are reachable.";
const PREVIEW_CHARS: usize = 120;

/// Send a probe prompt to the configured completion service and print the reply.
pub async fn probe(config: &EngramConfig) -> Result<()> {
    println!("Completion provider: {}", config.completion.provider);
    println!("Endpoint:            {}", config.completion.base_url);

    let service = completion::create_service(&config.completion).await?;
    println!("Model:               {}", service.model());

    let request = CompletionRequest::new(PROBE_PROMPT).with_max_tokens(50);
    let reply = service
        .complete(&request)
        .await
        .context("completion service did not answer the probe")?;

    println!();
    println!("Reply: {reply}");
    Ok(())
}

/// First [`PREVIEW_CHARS`] characters of `text`, on a char boundary.
pub(crate) fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let text = "é".repeat(PREVIEW_CHARS + 10);
        let out = preview(&text);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), PREVIEW_CHARS + 3);
    }
}
