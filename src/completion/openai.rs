//! OpenAI-compatible chat completions client (vLLM, llama.cpp server, etc.).
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionRequest, CompletionService, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_MESSAGE};
use crate::config::CompletionConfig;
use crate::error::{EngramError, Result};

pub struct OpenAiCompletion {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiCompletion {
    /// Build the client and resolve the served model name.
    ///
    /// Discovery failure is not fatal: the configured fallback identifier is used
    /// and a warning is logged.
    pub async fn connect(config: &CompletionConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngramError::completion(format!("failed to build HTTP client: {e}")))?;

        let mut service = Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            api_key: config.api_key.clone(),
            model: config.fallback_model.clone(),
            temperature: config.temperature,
            timeout,
        };

        match service.discover_model().await {
            Ok(model) => {
                tracing::info!(model = %model, base_url = %service.base_url, "completion model discovered");
                service.model = model;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = %service.model,
                    "could not fetch model name from completion server, using fallback"
                );
            }
        }

        Ok(service)
    }

    async fn fetch_models(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?
            .error_for_status()
            .map_err(|e| self.transport_error(e))?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| EngramError::completion(format!("malformed model listing: {e}")))
    }

    async fn discover_model(&self) -> Result<String> {
        let listing = self.fetch_models().await?;
        let models: ModelList = serde_json::from_value(listing)
            .map_err(|e| EngramError::completion(format!("malformed model listing: {e}")))?;
        models
            .data
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| EngramError::completion("server lists no models"))
    }

    fn transport_error(&self, e: reqwest::Error) -> EngramError {
        if e.is_timeout() {
            EngramError::completion(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else if let Some(status) = e.status() {
            EngramError::completion(format!("server returned HTTP {status}"))
        } else {
            EngramError::completion(format!("request failed: {e}"))
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let system = request
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature.unwrap_or(self.temperature),
        };

        tracing::debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            max_tokens = body.max_tokens,
            "sending completion request"
        );

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?
            .error_for_status()
            .map_err(|e| self.transport_error(e))?
            .json()
            .await
            .map_err(|e| EngramError::completion(format!("malformed completion response: {e}")))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(EngramError::completion("completion response had no text"));
        }
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<serde_json::Value> {
        self.fetch_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn config_for(base_url: String) -> CompletionConfig {
        CompletionConfig {
            base_url,
            timeout_secs: 2,
            ..Default::default()
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(normalize_base_url("http://x:8000/v1/"), "http://x:8000/v1");
    }

    #[tokio::test]
    async fn discovers_model_and_completes() {
        let router = Router::new()
            .route(
                "/v1/models",
                get(|| async { Json(serde_json::json!({"data": [{"id": "llama-3-8b"}]})) }),
            )
            .route(
                "/v1/chat/completions",
                post(|Json(body): Json<serde_json::Value>| async move {
                    let model = body["model"].as_str().unwrap_or_default().to_string();
                    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": format!(" {model}:{prompt} ")}}]
                    }))
                }),
            );
        let base = spawn_server(router).await;

        let service = OpenAiCompletion::connect(&config_for(base)).await.unwrap();
        assert_eq!(service.model(), "llama-3-8b");

        let text = service.complete(&CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(text, "llama-3-8b:hi");
    }

    #[tokio::test]
    async fn discovery_failure_uses_fallback() {
        let router = Router::new().route(
            "/v1/models",
            get(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "down") }),
        );
        let base = spawn_server(router).await;

        let service = OpenAiCompletion::connect(&config_for(base)).await.unwrap();
        assert_eq!(service.model(), "local-vllm-model");
    }

    #[tokio::test]
    async fn non_success_status_is_completion_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "nope") }),
        );
        let base = spawn_server(router).await;

        let service = OpenAiCompletion::connect(&config_for(base)).await.unwrap();
        let err = service.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, EngramError::Completion(_)));
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn empty_choices_are_rejected() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let base = spawn_server(router).await;

        let service = OpenAiCompletion::connect(&config_for(base)).await.unwrap();
        let err = service.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("no text"));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({"choices": []}))
            }),
        );
        let base = spawn_server(router).await;

        let mut config = config_for(base);
        config.timeout_secs = 1;
        let service = OpenAiCompletion::connect(&config).await.unwrap();
        let err = service.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
