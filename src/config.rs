//! Configuration management for model loading
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (models.toml)
//! - Environment variables (MODELS__*)
//!
//! ## Example config file (models.toml):
//! ```toml
//! [loader]
//! dir = "./models"
//! sorted = false
//! skip_hidden = true
//!
//! [diagnostics]
//! verbose = true
//!
//! [resolution]
//! fail_on_skipped = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::loader::LoadConfig;

/// Main configuration for model loading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Loader settings
    #[serde(default)]
    pub loader: LoaderSection,

    /// Diagnostics settings
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,

    /// Association resolution settings
    #[serde(default)]
    pub resolution: ResolutionSection,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSection {
    /// Directory holding model definition files
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    /// Sort definition files by name instead of keeping listing order
    #[serde(default)]
    pub sorted: bool,

    /// Ignore dot-files in the model directory
    #[serde(default = "default_true")]
    pub skip_hidden: bool,
}

/// Diagnostics configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsSection {
    /// Print every registration and resolution decision
    #[serde(default)]
    pub verbose: bool,
}

/// Resolution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolutionSection {
    /// Treat skipped associations as a failed load (CLI exit status)
    #[serde(default)]
    pub fail_on_skipped: bool,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_true() -> bool {
    true
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            sorted: false,
            skip_hidden: true,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["models.toml", ".models.toml", "config/models.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "model-registry") {
            let xdg_config = config_dir.config_dir().join("models.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // MODELS__LOADER__DIR, MODELS__DIAGNOSTICS__VERBOSE, ...
        builder = builder.add_source(
            Environment::with_prefix("MODELS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Loader options derived from the `[loader]` section
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            sorted: self.loader.sorted,
            skip_hidden: self.loader.skip_hidden,
        }
    }

    /// Get the model directory (resolves relative paths)
    pub fn models_dir(&self) -> PathBuf {
        if self.loader.dir.is_absolute() {
            self.loader.dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.loader.dir)
        }
    }
}
