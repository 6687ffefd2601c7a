use crate::context::{DEFAULT_EXCERPT_BUDGET, DEFAULT_TARGET_COLUMNS};
use crate::orchestrator::{DEFAULT_REQUEST_TIMEOUT, FallbackCredentials};
use crate::providers::ProviderId;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the askdocs server and CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider used when a request names none.
    pub default_provider: ProviderId,
    /// Process-wide API keys, one per provider at most.
    pub fallback_credentials: FallbackCredentials,
    /// Base URL overrides for self-hosted proxies.
    pub base_urls: HashMap<ProviderId, String>,
    /// Per-excerpt character budget.
    pub excerpt_char_budget: usize,
    /// Column names eligible for deterministic ordering.
    pub sort_target_columns: Vec<String>,
    /// Per-call timeout for backend requests.
    pub request_timeout: Duration,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let default_provider = optional("DEFAULT_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("DEFAULT_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(ProviderId::Perplexity);

        let mut fallback_credentials = FallbackCredentials::new();
        let mut base_urls = HashMap::new();
        for provider in ProviderId::ALL {
            let prefix = provider.as_str().to_uppercase();
            if let Some(key) = optional(&format!("{prefix}_API_KEY")) {
                fallback_credentials.insert(provider, key);
            }
            if let Some(url) = optional(&format!("{prefix}_BASE_URL")) {
                base_urls.insert(provider, url.trim().to_string());
            }
        }

        let excerpt_char_budget = optional("EXCERPT_CHAR_BUDGET")
            .map(|value| match value.trim().parse::<usize>() {
                Ok(budget) if budget > 0 => Ok(budget),
                _ => Err(ConfigError::InvalidValue("EXCERPT_CHAR_BUDGET".into())),
            })
            .transpose()?
            .unwrap_or(DEFAULT_EXCERPT_BUDGET);

        let sort_target_columns = optional("SORT_TARGET_COLUMNS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|column| !column.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|columns| !columns.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_COLUMNS.iter().map(|c| c.to_string()).collect());

        let request_timeout = optional("REQUEST_TIMEOUT_SECS")
            .map(|value| match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS".into())),
            })
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let server_port = optional("SERVER_PORT")
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
            })
            .transpose()?;

        Ok(Self {
            default_provider,
            fallback_credentials,
            base_urls,
            excerpt_char_budget,
            sort_target_columns,
            request_timeout,
            server_port,
        })
    }
}

/// Load `.env` from the working directory when present, then read the environment.
///
/// Call before installing the tracing subscriber so `RUST_LOG` and `ASKDOCS_LOG_FILE` set in
/// `.env` take effect.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}
