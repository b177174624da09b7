//! Configuration for shopscout.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (provider API keys, SHOPSCOUT_*)
//! 2. Config file (.shopscout/config.yaml)
//! 3. Defaults (~/.shopscout, mid defaults for timeouts and limits)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shopscout/config.yaml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::retry::RetryPolicy;
use crate::core::safety::SafetySettings;
use crate::providers::{
    AnthropicProvider, GeminiProvider, MockProvider, OpenAiProvider, Provider, ProviderKind,
};

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub providers: Option<ProvidersConfig>,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub breaker: Option<BreakerConfig>,
    #[serde(default)]
    pub safety: Option<SafetyConfig>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    pub google_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreakerConfig {
    pub failure_threshold: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafetyConfig {
    pub enabled: Option<bool>,
    pub max_query_length: Option<usize>,
    pub blocked_keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    pub max_results: Option<usize>,
    pub context_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    pub db_path: Option<String>,
}

/// Per-provider credentials and model names.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4-turbo-preview".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-sonnet-20240229".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub max_results: usize,
    pub context_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            context_size: 5,
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub providers: ProviderSettings,
    /// Per-attempt provider call timeout
    pub call_timeout: Duration,
    pub retry: RetryPolicy,
    pub breaker: BreakerSettings,
    pub safety: SafetySettings,
    pub search: SearchSettings,
    /// Catalog database location
    pub catalog_db: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: ProviderSettings::default(),
            call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            breaker: BreakerSettings::default(),
            safety: SafetySettings::default(),
            search: SearchSettings::default(),
            catalog_db: default_db_path(),
            config_file: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shopscout")
        .join("catalog.db")
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shopscout").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let mut settings = Self::default();

        if let Some(config_path) = find_config_file() {
            let file = load_config_file(&config_path)?;
            settings.apply_file(&file);
            settings.config_file = Some(config_path);
        }

        settings.apply_env();
        Ok(settings)
    }

    fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(providers) = &file.providers {
            if let Some(v) = &providers.google_api_key {
                self.providers.google_api_key = Some(v.clone());
            }
            if let Some(v) = &providers.gemini_model {
                self.providers.gemini_model = v.clone();
            }
            if let Some(v) = &providers.openai_api_key {
                self.providers.openai_api_key = Some(v.clone());
            }
            if let Some(v) = &providers.openai_model {
                self.providers.openai_model = v.clone();
            }
            if let Some(v) = &providers.anthropic_api_key {
                self.providers.anthropic_api_key = Some(v.clone());
            }
            if let Some(v) = &providers.anthropic_model {
                self.providers.anthropic_model = v.clone();
            }
        }

        if let Some(llm) = &file.llm {
            if let Some(v) = llm.timeout_seconds {
                self.call_timeout = Duration::from_secs(v);
            }
            if let Some(v) = llm.max_retries {
                self.retry.max_attempts = v;
            }
        }

        if let Some(breaker) = &file.breaker {
            if let Some(v) = breaker.failure_threshold {
                self.breaker.failure_threshold = v;
            }
            if let Some(v) = breaker.timeout_seconds {
                self.breaker.timeout = Duration::from_secs(v);
            }
        }

        if let Some(safety) = &file.safety {
            if let Some(v) = safety.enabled {
                self.safety.enabled = v;
            }
            if let Some(v) = safety.max_query_length {
                self.safety.max_query_length = v;
            }
            if let Some(v) = &safety.blocked_keywords {
                self.safety.blocked_keywords = v.clone();
            }
        }

        if let Some(search) = &file.search {
            if let Some(v) = search.max_results {
                self.search.max_results = v;
            }
            if let Some(v) = search.context_size {
                self.search.context_size = v;
            }
        }

        if let Some(catalog) = &file.catalog {
            if let Some(v) = &catalog.db_path {
                self.catalog_db = PathBuf::from(v);
            }
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_var("GOOGLE_API_KEY") {
            self.providers.google_api_key = Some(v);
        }
        if let Some(v) = env_var("GEMINI_MODEL") {
            self.providers.gemini_model = v;
        }
        if let Some(v) = env_var("OPENAI_API_KEY") {
            self.providers.openai_api_key = Some(v);
        }
        if let Some(v) = env_var("OPENAI_MODEL") {
            self.providers.openai_model = v;
        }
        if let Some(v) = env_var("ANTHROPIC_API_KEY") {
            self.providers.anthropic_api_key = Some(v);
        }
        if let Some(v) = env_var("ANTHROPIC_MODEL") {
            self.providers.anthropic_model = v;
        }
        if let Some(v) = env_var("SHOPSCOUT_DB") {
            self.catalog_db = PathBuf::from(v);
        }
        if let Some(v) = env_var("SHOPSCOUT_LLM_TIMEOUT") {
            if let Ok(seconds) = v.parse() {
                self.call_timeout = Duration::from_secs(seconds);
            }
        }
    }

    /// Provider kinds that have credentials (mock is always present).
    pub fn configured_provider_kinds(&self) -> Vec<ProviderKind> {
        let mut kinds = Vec::new();
        if self.providers.google_api_key.is_some() {
            kinds.push(ProviderKind::Gemini);
        }
        if self.providers.openai_api_key.is_some() {
            kinds.push(ProviderKind::OpenAi);
        }
        if self.providers.anthropic_api_key.is_some() {
            kinds.push(ProviderKind::Anthropic);
        }
        kinds.push(ProviderKind::Mock);
        kinds
    }

    /// Build the adapter list in fallback priority order. Providers with
    /// no credential are absent; the mock provider is always last.
    pub fn build_provider_stack(&self) -> Vec<Box<dyn Provider>> {
        let client = reqwest::Client::new();
        let mut providers: Vec<Box<dyn Provider>> = Vec::new();

        if let Some(key) = &self.providers.google_api_key {
            providers.push(Box::new(GeminiProvider::new(
                key.clone(),
                self.providers.gemini_model.clone(),
                client.clone(),
            )));
        }

        if let Some(key) = &self.providers.openai_api_key {
            providers.push(Box::new(OpenAiProvider::new(
                key.clone(),
                self.providers.openai_model.clone(),
                client.clone(),
            )));
        }

        if let Some(key) = &self.providers.anthropic_api_key {
            providers.push(Box::new(AnthropicProvider::new(
                key.clone(),
                self.providers.anthropic_model.clone(),
                client.clone(),
            )));
        }

        providers.push(Box::new(MockProvider::new()));
        providers
    }
}
