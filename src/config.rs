//! Configuration structures and loading logic

use crate::trainer::TrainerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main manager configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    pub api_port: u16,
    /// Persisted registry file (JSON, rewritten wholesale)
    pub registry_file: PathBuf,
    /// Base directory scanned for model type folders
    pub models_dir: PathBuf,
    /// Run a scan before serving requests
    pub scan_on_startup: bool,
    pub trainer: TrainerConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            registry_file: default_registry_file(),
            models_dir: default_models_dir(),
            scan_on_startup: true,
            trainer: TrainerConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(port) = std::env::var("MCQ_MANAGER_API_PORT") {
            config.api_port = port.parse().context("Invalid MCQ_MANAGER_API_PORT value")?;
        }
        if let Ok(registry_file) = std::env::var("MCQ_MANAGER_REGISTRY_FILE") {
            config.registry_file = PathBuf::from(registry_file);
        }
        if let Ok(models_dir) = std::env::var("MCQ_MANAGER_MODELS_DIR") {
            config.models_dir = PathBuf::from(models_dir);
        }
        if let Ok(binary_path) = std::env::var("MCQ_TRAINER_BINARY") {
            config.trainer.trainer_binary_path = binary_path;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_port < 1024 {
            anyhow::bail!("API port must be >= 1024 (got {})", self.api_port);
        }

        if self.trainer.default_epochs == 0 {
            anyhow::bail!("trainer.default_epochs must be positive");
        }
        if self.trainer.train_timeout_secs == 0 {
            anyhow::bail!("trainer.train_timeout_secs must be positive");
        }

        // Ensure registry file directory exists or can be created
        if let Some(parent) = self.registry_file.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create registry file directory: {:?}", parent))?;
        }

        Ok(())
    }
}

// Default functions
fn default_api_port() -> u16 {
    9002
}
fn default_registry_file() -> PathBuf {
    PathBuf::from("model_registry.json")
}
fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
