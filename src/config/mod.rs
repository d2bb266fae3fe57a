//! Configuration loading and environment overrides.
//!
//! The config file lives at `<config-dir>/config.toml`, where the config
//! dir is `$RELAYDESK_CONFIG_DIR` or `~/.relaydesk`. A missing file is
//! created with defaults on first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::memory::MemoryOptions;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion provider used when the caller does not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Key-value store backend: sqlite or memory.
    pub store_backend: String,
    /// Embedding backend: hashed or openai.
    pub embedding_backend: String,
    /// Directory holding the sqlite database.
    pub workspace_dir: PathBuf,
    /// Transcript retention and embedding options.
    pub memory: MemoryOptions,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_model: None,
            api_key: None,
            api_url: None,
            store_backend: "sqlite".to_string(),
            embedding_backend: "hashed".to_string(),
            workspace_dir: PathBuf::new(),
            memory: MemoryOptions::default(),
            config_path: PathBuf::new(),
        }
    }
}

/// Resolve the config directory: `$RELAYDESK_CONFIG_DIR` or `~/.relaydesk`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("RELAYDESK_CONFIG_DIR") {
        let expanded = shellexpand::tilde(dir.trim());
        return Ok(PathBuf::from(expanded.as_ref()));
    }
    let base = directories::BaseDirs::new().context("could not determine home directory")?;
    Ok(base.home_dir().join(".relaydesk"))
}

impl Config {
    /// Load the config file from the default location, creating it with
    /// defaults when absent.
    pub async fn load_or_init() -> Result<Self> {
        let dir = config_dir()?;
        Self::load_or_init_at(&dir).await
    }

    /// Load (or create) `config.toml` under an explicit directory.
    pub async fn load_or_init_at(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);

        let mut config = if path.exists() {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<Config>(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            let config = Config::default();
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, toml::to_string_pretty(&config)?).await?;
            config
        };

        config.config_path = path;
        if config.workspace_dir.as_os_str().is_empty() {
            config.workspace_dir = dir.join("workspace");
        } else if let Some(raw) = config.workspace_dir.to_str() {
            config.workspace_dir = PathBuf::from(shellexpand::tilde(raw).as_ref());
        }
        Ok(config)
    }

    /// Persist the current settings back to `config_path`.
    pub async fn save(&self) -> Result<()> {
        tokio::fs::write(&self.config_path, toml::to_string_pretty(self)?)
            .await
            .with_context(|| format!("failed to write {}", self.config_path.display()))
    }

    /// Apply environment overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("RELAYDESK_PROVIDER") {
            if !provider.trim().is_empty() {
                self.default_provider = Some(provider.trim().to_string());
            }
        }
        if let Ok(model) = std::env::var("RELAYDESK_MODEL") {
            if !model.trim().is_empty() {
                self.default_model = Some(model.trim().to_string());
            }
        }
        if self.api_key.is_none() {
            for var in ["RELAYDESK_API_KEY", "OPENAI_API_KEY"] {
                if let Ok(key) = std::env::var(var) {
                    if !key.trim().is_empty() {
                        self.api_key = Some(key.trim().to_string());
                        break;
                    }
                }
            }
        }
    }
}
