// src/config/loader.rs
//! Layered configuration loading
//!
//! Built-in defaults, then an optional TOML file, then `SCOPE__SECTION__KEY`
//! environment overrides. The merged result is validated before it is returned.

use crate::config::{constants::paths, ScopeConfig};
use config::{Config, Environment, File, FileFormat, Map};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration validation errors: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loader for [`ScopeConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: PathBuf,
    required: bool,
    environment: Option<Map<String, String>>,
}

impl ConfigLoader {
    /// Use `scope.toml` in the working directory if it exists
    pub fn new() -> Self {
        Self {
            file: PathBuf::from(paths::LOCAL_CONFIG_FILE),
            required: false,
            environment: None,
        }
    }

    /// Load from a specific file, which must exist
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: path.as_ref().to_path_buf(),
            required: true,
            environment: None,
        }
    }

    /// Replace the process environment with a fixed set of variables
    pub fn with_environment(mut self, vars: Map<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Merge all sources and validate
    pub fn load(&self) -> Result<ScopeConfig, ConfigError> {
        if !self.required && !self.file.exists() {
            debug!(path = %self.file.display(), "no configuration file, using defaults");
        }

        let environment = Environment::with_prefix(paths::ENV_PREFIX)
            .prefix_separator(paths::ENV_SEPARATOR)
            .separator(paths::ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("acquisition.initial_channels")
            .source(self.environment.clone());

        let merged = Config::builder()
            .add_source(
                File::from(self.file.as_path())
                    .format(FileFormat::Toml)
                    .required(self.required),
            )
            .add_source(environment)
            .build()?;

        let config: ScopeConfig = merged.try_deserialize()?;
        config.validate().map_err(|errors| {
            warn!(count = errors.len(), "configuration rejected");
            ConfigError::Invalid(errors)
        })?;

        Ok(config)
    }

    /// Parse and validate a TOML document without consulting other sources
    pub fn from_toml_str(content: &str) -> Result<ScopeConfig, ConfigError> {
        let config: ScopeConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Write a configuration as TOML
    pub fn export<P: AsRef<Path>>(config: &ScopeConfig, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
