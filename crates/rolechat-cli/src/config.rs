//! Layered application configuration.
//!
//! Built-in defaults, then a TOML file, then environment variables; later
//! layers win.  The LLM API key is only ever read from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use rolechat_agent::LlmClientConfig;
use rolechat_agent::llm::client::{
    DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, OPENAI_BASE_URL,
};
use rolechat_automation::{AutomationConfig, RetryPolicy};
use rolechat_store::StorageBackend;
use rolechat_web::WebConfig;
use rolechat_workflow::ExecutorConfig;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        let web = WebConfig::default();
        Self {
            bind: web.bind_addr,
            port: web.port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSection {
    /// Signed trigger URL.  Required for anything that dispatches.
    pub endpoint: String,
    pub timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_retry_after_secs: u64,
    pub max_description_chars: usize,
}

impl Default for AutomationSection {
    fn default() -> Self {
        let defaults = AutomationConfig::new("");
        Self {
            endpoint: String::new(),
            timeout_secs: defaults.timeout.as_secs(),
            health_timeout_secs: defaults.health_timeout.as_secs(),
            max_attempts: defaults.retry.max_attempts,
            retry_delay_ms: defaults.retry.base_delay.as_millis() as u64,
            max_retry_after_secs: defaults.retry.max_retry_after.as_secs(),
            max_description_chars: defaults.max_description_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub step_delay_ms: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            step_delay_ms: ExecutorConfig::default().step_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("data/rolechat.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub history_window: usize,
    /// From `OPENAI_API_KEY` only.
    #[serde(skip)]
    pub api_key: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            history_window: rolechat_agent::DEFAULT_HISTORY_WINDOW,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub automation: AutomationSection,
    pub executor: ExecutorSection,
    pub storage: StorageSection,
    pub llm: LlmSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Resolve all three layers.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        })?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("ROLECHAT_AUTOMATION_URL") {
            self.automation.endpoint = v;
        }
        if let Some(v) = lookup("ROLECHAT_STORAGE") {
            self.storage.backend = v
                .parse()
                .with_context(|| format!("invalid ROLECHAT_STORAGE `{v}`"))?;
        }
        if let Some(v) = lookup("ROLECHAT_DB_PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ROLECHAT_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("ROLECHAT_PORT") {
            self.server.port = v
                .parse()
                .with_context(|| format!("invalid ROLECHAT_PORT `{v}`"))?;
        }
        if let Some(v) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = v;
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("ROLECHAT_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("ROLECHAT_LOG") {
            self.logging.level = v;
        }
        Ok(())
    }

    // -- conversions ---------------------------------------------------------

    pub fn automation_config(&self) -> Result<AutomationConfig> {
        let a = &self.automation;
        if a.endpoint.trim().is_empty() {
            anyhow::bail!(
                "automation endpoint is not configured (set [automation].endpoint or ROLECHAT_AUTOMATION_URL)"
            );
        }
        let mut config = AutomationConfig::new(a.endpoint.trim())
            .with_timeout(Duration::from_secs(a.timeout_secs))
            .with_retry(RetryPolicy {
                max_attempts: a.max_attempts.max(1),
                base_delay: Duration::from_millis(a.retry_delay_ms),
                max_retry_after: Duration::from_secs(a.max_retry_after_secs),
            });
        config.health_timeout = Duration::from_secs(a.health_timeout_secs);
        config.max_description_chars = a.max_description_chars;
        Ok(config)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            step_delay: Duration::from_millis(self.executor.step_delay_ms),
        }
    }

    /// LLM settings, or `None` when no API key is set.
    pub fn llm_config(&self) -> Option<LlmClientConfig> {
        if self.llm.api_key.is_empty() {
            return None;
        }
        Some(
            LlmClientConfig::openai_compatible(&self.llm.api_key, &self.llm.base_url)
                .with_model(&self.llm.model)
                .with_max_tokens(self.llm.max_tokens)
                .with_temperature(self.llm.temperature),
        )
    }

    pub fn web_config(&self, connect_src: Vec<String>) -> WebConfig {
        WebConfig {
            bind_addr: self.server.bind.clone(),
            port: self.server.port,
            connect_src,
        }
    }
}
