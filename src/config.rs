//! Configuration for the benchmark toolchain.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// LLM configuration shared by the summarizer and the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gemini-2.5-flash", "gpt-4o")
    pub model: String,

    /// Maximum tokens for response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    50_000
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Credentials and endpoint for one search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API.
    pub api_base: String,
    /// API key for authentication.
    pub api_key: String,
}

/// Settings for both compared providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// The domain data API.
    pub data_api: ProviderConfig,
    /// The generic web search API.
    pub web_search: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            data_api: ProviderConfig {
                api_base: "https://api.kirha.ai".to_string(),
                api_key: String::new(),
            },
            web_search: ProviderConfig {
                api_base: "https://api.exa.ai".to_string(),
                api_key: String::new(),
            },
        }
    }
}

/// Locations of the input datasets and the output artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `prompts.jsonl` and the `results/` subdirectory.
    pub data_dir: PathBuf,
    /// Where the aggregated report is written.
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output: PathBuf::from("public/benchmark-results.json"),
        }
    }
}

impl PathsConfig {
    pub fn prompts(&self) -> PathBuf {
        self.data_dir.join("prompts.jsonl")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    pub fn data_api_results(&self) -> PathBuf {
        self.results_dir().join("kirha-result.jsonl")
    }

    pub fn web_search_results(&self) -> PathBuf {
        self.results_dir().join("exa-result.jsonl")
    }

    pub fn judge_results(&self) -> PathBuf {
        self.results_dir().join("judge-result.jsonl")
    }
}

/// Bounded exponential backoff for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Search provider settings
    pub providers: ProvidersConfig,
    /// Dataset and artifact locations
    pub paths: PathsConfig,
    /// Retry policy for remote calls
    pub retry: RetryConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    providers: Option<ProvidersFileSection>,
    paths: Option<PathsFileSection>,
    retry: Option<RetryFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ProvidersFileSection {
    data_api: Option<ProviderFileSection>,
    web_search: Option<ProviderFileSection>,
}

#[derive(Debug, Deserialize)]
struct ProviderFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathsFileSection {
    data_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RetryFileSection {
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

fn apply_provider(target: &mut ProviderConfig, section: Option<ProviderFileSection>) {
    if let Some(section) = section {
        if let Some(api_base) = section.api_base {
            target.api_base = api_base;
        }
        if let Some(api_key) = section.api_key {
            target.api_key = api_key;
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_*, KIRHA_*, EXA_*, BENCH_*)
    /// 2. Config file (~/.config/search-benchmark/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        if let Ok(api_key) = env::var("KIRHA_API_KEY") {
            self.providers.data_api.api_key = api_key;
        }

        if let Ok(api_base) = env::var("KIRHA_API_BASE") {
            self.providers.data_api.api_base = api_base;
        }

        if let Ok(api_key) = env::var("EXA_API_KEY") {
            self.providers.web_search.api_key = api_key;
        }

        if let Ok(api_base) = env::var("EXA_API_BASE") {
            self.providers.web_search.api_base = api_base;
        }

        if let Ok(data_dir) = env::var("BENCH_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(output) = env::var("BENCH_OUTPUT") {
            self.paths.output = PathBuf::from(output);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, filling unspecified fields with defaults.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| BenchError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(providers) = file_config.providers {
            apply_provider(&mut config.providers.data_api, providers.data_api);
            apply_provider(&mut config.providers.web_search, providers.web_search);
        }

        if let Some(paths) = file_config.paths {
            if let Some(data_dir) = paths.data_dir {
                config.paths.data_dir = data_dir;
            }
            if let Some(output) = paths.output {
                config.paths.output = output;
            }
        }

        if let Some(retry) = file_config.retry {
            if let Some(max_retries) = retry.max_retries {
                config.retry.max_retries = max_retries;
            }
            if let Some(base) = retry.base_delay_ms {
                config.retry.base_delay_ms = base;
            }
            if let Some(max) = retry.max_delay_ms {
                config.retry.max_delay_ms = max;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "search-benchmark")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the LLM settings needed by the summarizer and judge are present.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(BenchError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(BenchError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(BenchError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the data API credentials.
    pub fn validate_data_api(&self) -> Result<()> {
        if self.providers.data_api.api_key.is_empty() {
            return Err(BenchError::Config(
                "KIRHA_API_KEY environment variable is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate the web search credentials.
    pub fn validate_web_search(&self) -> Result<()> {
        if self.providers.web_search.api_key.is_empty() {
            return Err(BenchError::Config(
                "EXA_API_KEY environment variable is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(
            config.paths.judge_results(),
            PathBuf::from("data/results/judge-result.jsonl")
        );
        assert_eq!(
            config.paths.output,
            PathBuf::from("public/benchmark-results.json")
        );
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate_llm().is_err());
        assert!(config.validate_data_api().is_err());
        assert!(config.validate_web_search().is_err());
    }

    #[test]
    fn test_validate_llm_with_credentials() {
        let mut config = Config::default();
        config.llm.api_base = "https://api.example.com".to_string();
        config.llm.api_key = "test-key".to_string();
        assert!(config.validate_llm().is_ok());

        config.llm.model.clear();
        assert!(config.validate_llm().is_err());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
providers:
  web_search:
    api_key: exa-key
paths:
  data_dir: /tmp/bench
retry:
  max_retries: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.providers.web_search.api_key, "exa-key");
        assert_eq!(config.providers.web_search.api_base, "https://api.exa.ai");
        assert_eq!(config.paths.prompts(), PathBuf::from("/tmp/bench/prompts.jsonl"));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1_000);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("llm: [unclosed"),
            Err(BenchError::Config(_))
        ));
    }
}
