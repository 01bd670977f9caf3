//! Text completion services.
//!
//! Provides the [`CompletionService`] trait plus two implementations: an
//! OpenAI-compatible HTTP client ([`openai::OpenAiCompletion`], used against a
//! local vLLM server) and a fixed-reply stub ([`stub::StaticCompletion`]).
//! The implementation is chosen once from configuration via [`create_service`].

pub mod openai;
pub mod stub;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::CompletionConfig;
use crate::error::Result;

/// System message used when a request does not carry its own.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Token cap used when a request does not carry its own.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// A single prompt for the completion service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_message: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_message: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Capability interface for text generation.
///
/// Implementations must turn every failure (transport, timeout, non-2xx,
/// blank output) into [`crate::error::EngramError::Completion`]; a successful
/// return always carries non-blank text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate text for a prompt.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model identifier requests are issued against.
    fn model(&self) -> &str;

    /// Raw model listing from the backing service.
    async fn list_models(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "object": "list",
            "data": [{ "id": self.model(), "object": "model" }]
        }))
    }
}

/// Create the completion service named by `config.provider`.
///
/// The `"openai"` provider performs model discovery here, so this is the point
/// where startup first talks to the completion server.
pub async fn create_service(config: &CompletionConfig) -> anyhow::Result<Arc<dyn CompletionService>> {
    match config.provider.as_str() {
        "openai" => {
            let service = openai::OpenAiCompletion::connect(config).await?;
            Ok(Arc::new(service))
        }
        "static" => Ok(Arc::new(stub::StaticCompletion::reply(
            config.static_response.clone(),
        ))),
        other => anyhow::bail!("unknown completion provider: {other}. Supported: openai, static"),
    }
}
