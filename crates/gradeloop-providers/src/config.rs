//! Configuration loading and oracle factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradeloop_core::grader::GraderConfig;
use gradeloop_core::traits::Oracle;

use crate::openai::{OpenAiOracle, DEFAULT_TIMEOUT_SECS};

/// Configuration for a single oracle backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Ollama served through its OpenAI-compatible API.
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level gradeloop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeloopConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Per-call oracle timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Total oracle calls per grade, including the first.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max oracle calls in flight; 0 disables the cap.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_attempts() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    500
}
fn default_parallelism() -> usize {
    4
}

impl Default for GradeloopConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
        }
    }
}

impl GradeloopConfig {
    /// Grader settings derived from this config, optionally overriding the model.
    pub fn grader_config(&self, model: Option<&str>) -> GraderConfig {
        GraderConfig {
            model: model.unwrap_or(&self.default_model).to_string(),
            max_attempts: self.max_attempts.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI { api_key, base_url } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradeloop.toml` in the current directory
/// 2. `~/.config/gradeloop/config.toml`
///
/// `GRADELOOP_API_KEY` overrides the `openai` provider's key.
pub fn load_config() -> Result<GradeloopConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradeloopConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("gradeloop.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradeloopConfig::default(),
    };

    Ok(apply_env(config, std::env::var("GRADELOOP_API_KEY").ok()))
}

fn parse_config(content: &str) -> Result<GradeloopConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_env(mut config: GradeloopConfig, api_key_override: Option<String>) -> GradeloopConfig {
    if let Some(key) = api_key_override {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradeloop"))
}

/// Create an oracle from its configuration.
pub fn create_oracle(
    name: &str,
    config: &ProviderConfig,
    timeout_secs: u64,
) -> Result<Arc<dyn Oracle>> {
    let oracle = match config {
        ProviderConfig::OpenAI { api_key, base_url } => OpenAiOracle::new(
            name,
            Some(api_key.clone()),
            base_url.clone(),
            timeout_secs,
        ),
        ProviderConfig::Ollama { base_url } => {
            OpenAiOracle::new(name, None, Some(base_url.clone()), timeout_secs)
        }
    }
    .with_context(|| format!("failed to build oracle client '{name}'"))?;
    Ok(Arc::new(oracle))
}
