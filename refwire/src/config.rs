use crate::cli::DecodeArgs;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use refwire_core::DecodeOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub decode: DecodeOptions,
}

impl AppConfig {
    /// Applies command-line overrides on top of the file settings.
    pub fn decode_options(&self, args: &DecodeArgs) -> DecodeOptions {
        let mut options = self.decode.clone();

        if args.lossy {
            options.strict_utf8 = false;
        }
        if let Some(limit) = args.recursion_limit {
            options.recursion_limit = limit;
        }
        if let Some(size) = args.max_size {
            options.max_message_size = Some(size);
        }

        options
    }
}

pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Uses `path` when given, otherwise `config.json` in the platform config directory.
    pub fn new(path: Option<PathBuf>) -> Self {
        let config_path = path.or_else(|| {
            ProjectDirs::from("com", "refwire", "refwire")
                .map(|dirs| dirs.config_dir().join("config.json"))
        });

        Self { config_path }
    }

    pub fn load(&self) -> Result<AppConfig> {
        let Some(path) = &self.config_path else {
            return Ok(AppConfig::default());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }
}
