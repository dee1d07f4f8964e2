//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use study_assistant_core::SummarySettings;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which remote service produces summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryBackendKind {
    HuggingFace,
    OpenAi,
}

impl SummaryBackendKind {
    fn default_model(&self) -> &'static str {
        match self {
            SummaryBackendKind::HuggingFace => "facebook/bart-large-cnn",
            SummaryBackendKind::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for SummaryBackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(SummaryBackendKind::HuggingFace),
            "openai" => Ok(SummaryBackendKind::OpenAi),
            other => Err(format!(
                "'{}' is not a summary backend (expected huggingface or openai)",
                other
            )),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub upload_dir: PathBuf,
    pub max_file_size: usize,
    pub session_ttl_secs: u64,
    pub allowed_origin: String,
    pub summary_backend: SummaryBackendKind,
    pub summary_model: String,
    pub huggingface_api_key: Option<String>,
    pub huggingface_api_url: String,
    pub openai_api_key: Option<String>,
    pub max_chunk_chars: usize,
    pub chunk_delay_ms: u64,
    pub remote_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upload and Session Settings ---
        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));
        let max_file_size = parse_or(&lookup, "MAX_FILE_SIZE", 50 * 1024 * 1024)?;
        let session_ttl_secs = parse_or(&lookup, "SESSION_TTL_SECS", 86_400)?;
        let allowed_origin = lookup("ALLOWED_ORIGIN")
            .unwrap_or_else(|| "http://localhost:8080".to_string());

        // --- Load Summarization Settings ---
        let summary_backend = match lookup("SUMMARY_BACKEND") {
            Some(value) => value
                .parse::<SummaryBackendKind>()
                .map_err(|e| ConfigError::InvalidValue("SUMMARY_BACKEND".to_string(), e))?,
            None => SummaryBackendKind::HuggingFace,
        };
        let summary_model = lookup("SUMMARY_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| summary_backend.default_model().to_string());

        let huggingface_api_key = lookup("HUGGINGFACE_API_KEY").filter(|k| !k.is_empty());
        let huggingface_api_url = lookup("HUGGINGFACE_API_URL")
            .unwrap_or_else(|| "https://api-inference.huggingface.co/models".to_string())
            .trim_end_matches('/')
            .to_string();

        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        if summary_backend == SummaryBackendKind::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        let max_chunk_chars: usize = parse_or(&lookup, "MAX_CHUNK_CHARS", 3000)?;
        if max_chunk_chars == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_CHUNK_CHARS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let chunk_delay_ms = parse_or(&lookup, "CHUNK_DELAY_MS", 500)?;
        let remote_timeout_secs = parse_or(&lookup, "REMOTE_TIMEOUT_SECS", 30)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            upload_dir,
            max_file_size,
            session_ttl_secs,
            allowed_origin,
            summary_backend,
            summary_model,
            huggingface_api_key,
            huggingface_api_url,
            openai_api_key,
            max_chunk_chars,
            chunk_delay_ms,
            remote_timeout_secs,
        })
    }

    pub fn summary_settings(&self) -> SummarySettings {
        SummarySettings {
            max_chunk_chars: self.max_chunk_chars,
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
