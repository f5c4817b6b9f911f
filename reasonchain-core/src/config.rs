//! Configuration system for Reasonchain.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment -> CLI overrides. API keys are never
//! stored in the config itself; the config only names the environment
//! variables they are read from, and [`Credentials::resolve`] reads them once
//! at startup.

use crate::error::ConfigError;
use crate::gateway::GatewayConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on search findings handed to the finishing stage.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Instruction given to the finishing model in every mode.
pub const DEFAULT_FINISHING_PROMPT: &str =
    "Answer the initial <QUESTION> in a single sentence based on the <REASONING>";

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reasoning: ReasoningConfig,
    pub finishing: FinishingConfig,
    pub search: SearchConfig,
    pub gateway: GatewayConfig,
    pub retry: RetryConfig,
    /// Upper bound on a single stage's remote call, in seconds.
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reasoning: ReasoningConfig::default(),
            finishing: FinishingConfig::default(),
            search: SearchConfig::default(),
            gateway: GatewayConfig::default(),
            retry: RetryConfig::default(),
            stage_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Validate this config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid. Problems that would make
    /// the pipeline unusable are reported here rather than failing load.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.retry.max_attempts == 0 {
            warnings.push(
                "retry.max_attempts is 0; stages will be attempted once anyway".to_string(),
            );
        }
        if self.search.max_results > MAX_SEARCH_RESULTS {
            warnings.push(format!(
                "search.max_results ({}) exceeds the cap of {}; results will be truncated",
                self.search.max_results, MAX_SEARCH_RESULTS
            ));
        }
        if self.stage_timeout_secs == 0 {
            warnings.push("stage_timeout_secs is 0; every stage will time out".to_string());
        }
        if self.search.timeout_secs == 0 {
            warnings.push("search.timeout_secs is 0; every search will time out".to_string());
        }
        if self.reasoning.stop_sequence.is_empty() {
            warnings.push(
                "reasoning.stop_sequence is empty; the transcript will not be truncated"
                    .to_string(),
            );
        }
        warnings
    }
}

/// Reasoning-model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Provider label used in logs.
    pub provider: String,
    /// Model identifier (e.g., "deepseek-reasoner").
    pub model: String,
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Provider truncates output at this delimiter.
    pub stop_sequence: String,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-reasoner".to_string(),
            base_url: "https://api.deepseek.com".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            stop_sequence: "</think>".to_string(),
        }
    }
}

/// Finishing-model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishingConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    /// System instruction shared by all finishing modes.
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for FinishingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            system_prompt: DEFAULT_FINISHING_PROMPT.to_string(),
            temperature: None,
        }
    }
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub api_key_env: String,
    /// Number of findings kept from the provider; capped at [`MAX_SEARCH_RESULTS`].
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: MAX_SEARCH_RESULTS,
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    /// `max_results` clamped to the hard cap.
    pub fn effective_max_results(&self) -> usize {
        self.max_results.min(MAX_SEARCH_RESULTS)
    }
}

/// Attempt policy for stage calls.
///
/// The default is a single attempt per stage; raising `max_attempts` enables
/// exponential backoff between attempts on transient provider errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Load configuration with layered merging.
///
/// `path` is an explicit TOML file (e.g. from `--config`); it is an error
/// for it to be missing. The user-level file is optional.
pub fn load_config(
    path: Option<&Path>,
    overrides: Option<&PipelineConfig>,
) -> Result<PipelineConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    // User-level config
    if let Some(dirs) = directories::ProjectDirs::from("dev", "reasonchain", "reasonchain") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::Invalid {
                message: format!("config file not found: {}", path.display()),
            });
        }
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (REASONCHAIN_FINISHING__MODEL, REASONCHAIN_GATEWAY__PORT, ...)
    figment = figment.merge(Env::prefixed("REASONCHAIN_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    Ok(figment.extract()?)
}

/// Provider API keys, read once at process start.
#[derive(Clone)]
pub struct Credentials {
    pub reasoning_api_key: String,
    pub finishing_api_key: String,
    pub search_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("reasoning_api_key", &"[REDACTED]")
            .field("finishing_api_key", &"[REDACTED]")
            .field("search_api_key", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Read all keys from the process environment.
    pub fn resolve(config: &PipelineConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |var| std::env::var(var).ok())
    }

    /// Read all keys through `lookup`. Missing or blank values fail fast.
    pub fn resolve_with<F>(config: &PipelineConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| -> Result<String, ConfigError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::EnvVarMissing {
                    var: var.to_string(),
                })
        };
        Ok(Self {
            reasoning_api_key: read(&config.reasoning.api_key_env)?,
            finishing_api_key: read(&config.finishing.api_key_env)?,
            search_api_key: read(&config.search.api_key_env)?,
        })
    }
}
