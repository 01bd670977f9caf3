use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngramConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    /// `"openai"` (any OpenAI-compatible server such as vLLM) or `"static"`.
    pub provider: String,
    pub base_url: String,
    pub api_key: String,
    /// Model identifier used when discovery against `/models` fails.
    pub fallback_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Reply returned by the `"static"` provider.
    pub static_response: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// `"substring"` or `"fts"`.
    pub strategy: String,
    pub default_top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_engram_dir()
            .join("engram.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "http://localhost:8000/v1".into(),
            api_key: "not-needed".into(),
            fallback_model: "local-vllm-model".into(),
            max_tokens: 128,
            temperature: 0.7,
            timeout_secs: 60,
            static_response: "A quiet memory.".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: "substring".into(),
            default_top_k: 5,
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.engram/`
pub fn default_engram_dir() -> PathBuf {
    home_dir().join(".engram")
}

/// Returns the default config file path: `~/.engram/config.toml`
pub fn default_config_path() -> PathBuf {
    default_engram_dir().join("config.toml")
}

impl EngramConfig {
    /// Load config from `ENGRAM_CONFIG` or the default path, then apply env var overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ENGRAM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path());
        Self::load_from(path)
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EngramConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (ENGRAM_DB, ENGRAM_LOG_LEVEL, ENGRAM_LLM_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ENGRAM_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("ENGRAM_LLM_URL") {
            self.completion.base_url = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngramConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.completion.provider, "openai");
        assert_eq!(config.completion.base_url, "http://localhost:8000/v1");
        assert_eq!(config.completion.fallback_model, "local-vllm-model");
        assert_eq!(config.retrieval.strategy, "substring");
        assert!(config.storage.db_path.ends_with("engram.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"
port = 8080

[storage]
db_path = "/tmp/test.db"

[completion]
base_url = "http://gpu-box:8000/v1"
timeout_secs = 5
"#;
        let config: EngramConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.completion.base_url, "http://gpu-box:8000/v1");
        assert_eq!(config.completion.timeout_secs, 5);
        // defaults still apply for unset fields
        assert_eq!(config.completion.max_tokens, 128);
        assert_eq!(config.retrieval.default_top_k, 5);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = EngramConfig::default();
        std::env::set_var("ENGRAM_DB", "/tmp/override.db");
        std::env::set_var("ENGRAM_LOG_LEVEL", "trace");
        std::env::set_var("ENGRAM_LLM_URL", "http://10.0.0.2:8000/v1");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.completion.base_url, "http://10.0.0.2:8000/v1");

        std::env::remove_var("ENGRAM_DB");
        std::env::remove_var("ENGRAM_LOG_LEVEL");
        std::env::remove_var("ENGRAM_LLM_URL");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = EngramConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
