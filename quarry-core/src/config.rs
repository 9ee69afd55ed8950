//! Configuration system for Quarry.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/quarry/config.toml` and/or `.quarry/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for a Quarry research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarryConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// The two text-model configurations used by the pipeline.
///
/// `primary` handles planning, extraction, synthesis and direct answers;
/// `lightweight` handles query rewriting and relevancy scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub primary: ModelConfig,
    pub lightweight: ModelConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: ModelConfig::default(),
            lightweight: ModelConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_tokens: 500,
                ..ModelConfig::default()
            },
        }
    }
}

/// Settings for a single model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name: "openai" or any OpenAI-compatible endpoint.
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 120,
        }
    }
}

/// Search backend credentials and executor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Environment variable holding the Serper API key (web + scholar).
    pub serper_api_key_env: String,
    /// Environment variable holding the Bing Web Search key.
    pub bing_api_key_env: String,
    /// Environment variable holding the Google Custom Search key.
    pub google_api_key_env: String,
    /// Environment variable holding the Google Custom Search engine id.
    pub google_cx_env: String,
    /// Maximum backend calls per rolling 60-second window.
    pub rate_limit_per_minute: usize,
    /// HTTP timeout for every backend call.
    pub timeout_secs: u64,
    /// Results requested per planned search query.
    pub results_per_query: usize,
    /// Results requested from the encyclopedic fallback.
    pub fallback_results: usize,
    /// Maximum characters kept from a fetched page.
    pub fetch_max_chars: usize,
    /// Fetch page text for results that arrive without a snippet.
    pub fetch_missing_snippets: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serper_api_key_env: "SERPER_API_KEY".to_string(),
            bing_api_key_env: "BING_API_KEY".to_string(),
            google_api_key_env: "GOOGLE_API_KEY".to_string(),
            google_cx_env: "GOOGLE_CX".to_string(),
            rate_limit_per_minute: 20,
            timeout_secs: 10,
            results_per_query: 5,
            fallback_results: 3,
            fetch_max_chars: 5000,
            fetch_missing_snippets: false,
        }
    }
}

/// Where reports and charts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Render PNG charts into the report.
    pub charts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("outputs"),
            charts: true,
        }
    }
}

impl QuarryConfig {
    /// Reject values that would stall or disable the pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid {
                message: "search.rate_limit_per_minute must be greater than 0".into(),
            });
        }
        if self.search.results_per_query == 0 {
            return Err(ConfigError::Invalid {
                message: "search.results_per_query must be greater than 0".into(),
            });
        }
        for (name, model) in [
            ("llm.primary", &self.llm.primary),
            ("llm.lightweight", &self.llm.lightweight),
        ] {
            if model.model.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{name}.model must not be empty"),
                });
            }
            if model.max_tokens == 0 {
                return Err(ConfigError::Invalid {
                    message: format!("{name}.max_tokens must be greater than 0"),
                });
            }
        }
        Ok(())
    }
}

/// Load configuration with layered sources.
///
/// Order (later wins): defaults, user config, workspace `.quarry/config.toml`,
/// `QUARRY_*` environment variables, then explicit overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&QuarryConfig>,
) -> Result<QuarryConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(QuarryConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".quarry").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // QUARRY_SEARCH__RATE_LIMIT_PER_MINUTE, QUARRY_LLM__PRIMARY__MODEL, ...
    figment = figment.merge(Env::prefixed("QUARRY_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: QuarryConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from one explicit TOML file layered over the defaults.
pub fn load_config_file(path: &Path) -> Result<QuarryConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let config: QuarryConfig = Figment::from(Serialized::defaults(QuarryConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("QUARRY_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
    config.validate()?;
    Ok(config)
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "quarry", "quarry")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Render the effective configuration as TOML.
pub fn to_toml_string(config: &QuarryConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}
