//! Configuration
//!
//! Config is read from `shapeshift.toml` in the working directory, or from
//! an explicit path.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`SHAPESHIFT_TEMPLATE`, `SHAPESHIFT_STATUS_FIELD`)
//! 2. Config file
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::template::Template;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "shapeshift.toml";

/// Default `res` field holding the HTTP status code
pub const DEFAULT_STATUS_FIELD: &str = "status";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Path to the response template (.json, .yaml, .yml)
    #[serde(default)]
    pub template: Option<PathBuf>,

    /// Name of the `res` field applied as the HTTP status code
    #[serde(default = "default_status_field")]
    pub status_field: String,
}

fn default_status_field() -> String {
    DEFAULT_STATUS_FIELD.to_string()
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            template: None,
            status_field: default_status_field(),
        }
    }
}

impl FormatConfig {
    /// Load configuration from an explicit file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FormatError::ConfigError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `shapeshift.toml` from the working directory
    ///
    /// Returns default config if the file doesn't exist.
    pub fn discover() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FormatError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        if config.status_field.is_empty() {
            return Err(FormatError::ConfigError {
                reason: "status_field must not be empty".to_string(),
            });
        }
        Ok(config)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    /// Empty values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(template) = std::env::var("SHAPESHIFT_TEMPLATE") {
            if !template.is_empty() {
                self.template = Some(PathBuf::from(template));
            }
        }

        if let Ok(field) = std::env::var("SHAPESHIFT_STATUS_FIELD") {
            if !field.is_empty() {
                self.status_field = field;
            }
        }

        self
    }

    /// Load the configured template
    pub fn load_template(&self) -> Result<Template> {
        let path = self.template.as_ref().ok_or(FormatError::NoTemplate)?;
        Template::load(path)
    }
}
