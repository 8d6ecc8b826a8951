// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tool configuration.
//!
//! ```toml
//! [directory]
//! server = "dc01.example.com"
//! template_container = "CN=Certificate Templates,CN=Public Key Services,CN=Services,CN=Configuration,DC=example,DC=com"
//!
//! [sync]
//! dry_run = false
//! protected_attributes = ["msPKI-Cert-Template-OID"]
//!
//! [policy]
//! pretty = true
//!
//! [logging]
//! level = "info"
//! json_format = false
//! ```
//!
//! Every section is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TemplateError};
use crate::logging::LogLevel;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "ADCS_TEMPLATE_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "adcs-templates.toml";

/// Complete tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Directory location.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Synchronization behavior.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Policy document output.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Config`] if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| TemplateError::config(format!("Invalid TOML: {e}")))
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TemplateError::config(format!("TOML serialize: {e}")))
    }

    /// Validate the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if let Some(server) = &self.directory.server {
            if server.trim().is_empty() {
                errors.push("directory.server must not be empty".to_string());
            }
        }

        if let Some(container) = &self.directory.template_container {
            if !container.trim_start().to_ascii_uppercase().starts_with("CN=") {
                errors.push(format!(
                    "directory.template_container must be a distinguished name, got '{container}'"
                ));
            }
        }

        for name in &self.sync.protected_attributes {
            if name.trim().is_empty() {
                errors.push("sync.protected_attributes must not contain empty names".to_string());
                break;
            }
        }

        if LogLevel::parse(&self.logging.level).is_none() {
            errors.push(format!("logging.level '{}' is not a log level", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Directory location settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Domain controller host name.
    #[serde(default)]
    pub server: Option<String>,

    /// Distinguished name of the certificate template container.
    #[serde(default)]
    pub template_container: Option<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    /// Compute changes without writing them.
    #[serde(default)]
    pub dry_run: bool,

    /// Attributes never written, whatever the desired state says.
    #[serde(default)]
    pub protected_attributes: Vec<String>,
}

/// Policy document output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Indent the XML output.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable structured JSON logging.
    #[serde(default)]
    pub json_format: bool,

    /// Log file path; stderr when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration file loader.
///
/// # Search Order
///
/// 1. Explicit path (if set via `with_path()`)
/// 2. Environment variable `ADCS_TEMPLATE_CONFIG`
/// 3. Current directory: `./adcs-templates.toml`
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    explicit_path: Option<PathBuf>,
    validate: bool,
    env_var_name: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with default settings.
    pub fn new() -> Self {
        Self {
            explicit_path: None,
            validate: true,
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Set an explicit configuration file path.
    ///
    /// When set, only this path is checked.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable validation after loading.
    ///
    /// Default: `true`
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Set the environment variable name for path override.
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = name.into();
        self
    }

    /// Load the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, it cannot be read, the TOML is
    /// invalid, or validation fails.
    pub fn load(&self) -> Result<SyncConfig> {
        let path = self.find_config_file()?;
        self.load_path(&path)
    }

    /// Load the configuration file, or defaults when none exists.
    ///
    /// An explicit path or environment override that points nowhere is still
    /// an error.
    pub fn load_or_default(&self) -> Result<SyncConfig> {
        if self.explicit_path.is_none() && std::env::var_os(&self.env_var_name).is_none() {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !local.exists() {
                return Ok(SyncConfig::default());
            }
        }
        self.load()
    }

    /// Load configuration from a TOML string.
    pub fn load_from_str(&self, toml_content: &str) -> Result<SyncConfig> {
        let config = SyncConfig::from_toml(toml_content)?;
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Find the configuration file path.
    pub fn find_config_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(TemplateError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        if let Ok(env_path) = std::env::var(&self.env_var_name) {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(path);
            }
            return Err(TemplateError::config(format!(
                "Configuration file from {} not found: {env_path}",
                self.env_var_name
            )));
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }

        Err(TemplateError::config(format!(
            "No configuration file found. Set {} or create ./{DEFAULT_CONFIG_FILE}",
            self.env_var_name
        )))
    }

    fn load_path(&self, path: &Path) -> Result<SyncConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TemplateError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        self.load_from_str(&content)
    }
}
