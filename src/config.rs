//! Engine configuration.
//!
//! Configuration is read from TOML; every section and field has a default so an
//! empty document is a valid config. Provider credentials usually come from the
//! environment and are overlaid with [`Config::apply_env`].

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{AgentflowError, Result};

const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_MAX_SESSIONS: u64 = 100;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 3600;
const DEFAULT_WORKFLOWS_PATH: &str = "data/workflows.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// model provider config
    pub llm: LlmConfig,
    /// agent loop config
    pub agent: AgentConfig,
    /// conversation memory config
    pub memory: MemoryConfig,
    /// store config
    pub store: StoreConfig,
    /// logging config
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Openai,
    Aiml,
    Gemini,
}

impl LlmProvider {
    fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Openai => "https://api.openai.com/v1",
            LlmProvider::Aiml => "https://api.aimlapi.com/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Openai | LlmProvider::Aiml => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-1.5-flash",
        }
    }

    /// environment variable prefix, e.g. `OPENAI` for `OPENAI_API_KEY`
    fn env_prefix(&self) -> &'static str {
        match self {
            LlmProvider::Openai => "OPENAI",
            LlmProvider::Aiml => "AIML",
            LlmProvider::Gemini => "GEMINI",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// which OpenAI-compatible provider to talk to
    pub provider: LlmProvider,
    /// api key, usually taken from the environment
    pub api_key: Option<String>,
    /// overrides the provider's default base url
    pub base_url: Option<String>,
    /// overrides the provider's default model
    pub model: Option<String>,
    /// default sampling temperature
    pub temperature: f32,
    /// http request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            base_url: None,
            model: None,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| self.provider.default_model().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// iteration ceiling of the tool-calling loop
    pub max_iterations: usize,
    /// use the provider's structured tool calls when the client supports them
    pub native_tools: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            native_tools: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// maximum number of live conversation sessions
    pub max_sessions: u64,
    /// sessions idle for longer than this are evicted
    pub idle_timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// store type
    pub store_type: StoreType,
    /// path of the workflows file when `store_type = "file"`
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: DEFAULT_WORKFLOWS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Mem,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// default filter when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref()).map_err(|e| AgentflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        Ok(config)
    }

    /// Default config overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay provider settings looked up through `lookup`.
    ///
    /// `LLM_PROVIDER` selects the provider explicitly; otherwise the first of
    /// `OPENAI_API_KEY`, `AIML_API_KEY`, `GEMINI_API_KEY` that is set decides.
    /// Values already present in the config win over the environment.
    pub fn apply_env<F>(
        &mut self,
        lookup: F,
    ) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = provider.trim().to_lowercase().parse::<LlmProvider>().map_err(|_| AgentflowError::Config(format!("unknown LLM_PROVIDER '{}'", provider)))?;
        } else if self.llm.api_key.is_none() {
            let detected = [LlmProvider::Openai, LlmProvider::Aiml, LlmProvider::Gemini]
                .into_iter()
                .find(|p| lookup(&format!("{}_API_KEY", p.env_prefix())).is_some());
            if let Some(provider) = detected {
                self.llm.provider = provider;
            }
        }

        let prefix = self.llm.provider.env_prefix();
        if self.llm.api_key.is_none() {
            self.llm.api_key = lookup(&format!("{}_API_KEY", prefix));
        }
        if self.llm.base_url.is_none() {
            self.llm.base_url = lookup(&format!("{}_BASE_URL", prefix));
        }
        if self.llm.model.is_none() {
            self.llm.model = lookup(&format!("{}_MODEL", prefix));
        }

        Ok(())
    }
}
