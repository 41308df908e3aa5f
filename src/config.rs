use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::ai::AiConfig;

pub const CONFIG_FILE: &str = "backfill.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
}

/// Command line overrides for the `[ai]` section
#[derive(Debug, Default, Clone)]
pub struct AiOverrides {
    pub enabled: bool,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load an explicit config file, or the default one if it exists
    pub fn resolve(explicit: Option<&Path>, repo_root: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = repo_root.join(CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        self.ai
            .provider
            .parse::<crate::ai::AiProvider>()
            .with_context(|| "Invalid [ai] provider")?;

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            anyhow::bail!(
                "[ai] temperature must be between 0 and 2, got {}",
                self.ai.temperature
            );
        }

        if self.ai.max_tokens == 0 {
            anyhow::bail!("[ai] max_tokens must be greater than 0");
        }

        Ok(())
    }

    /// Apply command line flags on top of the file values
    pub fn apply(&mut self, overrides: AiOverrides) {
        if overrides.enabled {
            self.ai.enabled = true;
        }
        if let Some(provider) = overrides.provider {
            self.ai.provider = provider;
        }
        if overrides.api_key.is_some() {
            self.ai.api_key = overrides.api_key;
        }
        if overrides.base_url.is_some() {
            self.ai.base_url = overrides.base_url;
        }
        if overrides.model.is_some() {
            self.ai.model = overrides.model;
        }
    }
}
