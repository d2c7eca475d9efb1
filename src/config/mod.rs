//! Configuration module for argcast
//!
//! This module handles:
//! - Per-argument cast settings (forwarding, fast path, default messages)
//! - The tool configuration file (`argcast.toml`) with defaults and
//!   per-argument overrides
//! - Pipeline files (JSON) declaring the step chain of each argument
//!
//! # Config Location
//!
//! The configuration file lives in the platform config directory:
//! - **Linux**: `~/.config/argcast/argcast.toml`
//! - **macOS**: `~/Library/Application Support/argcast/argcast.toml`
//! - **Windows**: `%APPDATA%\argcast\argcast.toml`
//!
//! # Example
//!
//! ```ignore
//! use argcast::config::{ArgcastConfig, PipelineFile};
//!
//! let config = ArgcastConfig::load_or_default(ArgcastConfig::default_path());
//! let file = PipelineFile::load("pipelines.json")?;
//! let casts = file.into_casts(&config)?;
//! ```

use crate::error::{ArgcastError, Result, ResultExt};
use crate::pipeline::{ArgumentCast, ArgumentDeclaration, Chain, MessageTemplate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "argcast";

/// Config filename
pub const CONFIG_FILE: &str = "argcast.toml";

/// Default limit on conditional steps before forwarding analysis is skipped
pub const DEFAULT_MAX_CONDITIONAL_STEPS: usize = 4;

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

fn default_true() -> bool {
    true
}

fn default_max_conditional_steps() -> usize {
    DEFAULT_MAX_CONDITIONAL_STEPS
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Per-argument cast configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastSettings {
    /// Return statically forwarded inputs without running the pipeline
    #[serde(default = "default_true")]
    pub forwarding: bool,

    /// Use the single-scalar fast path when the chain qualifies
    #[serde(default = "default_true")]
    pub fast_path: bool,

    /// Chains with more conditional steps skip forwarding analysis
    #[serde(default = "default_max_conditional_steps")]
    pub max_conditional_steps: usize,

    /// Default-default error message; `%s` is replaced by the argument name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_error: Option<String>,
}

impl Default for CastSettings {
    fn default() -> Self {
        Self {
            forwarding: true,
            fast_path: true,
            max_conditional_steps: DEFAULT_MAX_CONDITIONAL_STEPS,
            default_error: None,
        }
    }
}

impl CastSettings {
    /// The message used when neither a step nor the chain supplies one
    pub fn default_message(&self) -> MessageTemplate {
        match &self.default_error {
            Some(template) if template.contains("%s") => {
                MessageTemplate::new(template.clone()).with_argument_name()
            }
            Some(template) => MessageTemplate::new(template.clone()),
            None => MessageTemplate::invalid_argument(),
        }
    }
}

/// Partial settings; unset fields fall back to the config defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_path: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conditional_steps: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_error: Option<String>,
}

impl SettingsOverride {
    pub fn apply(&self, base: &CastSettings) -> CastSettings {
        CastSettings {
            forwarding: self.forwarding.unwrap_or(base.forwarding),
            fast_path: self.fast_path.unwrap_or(base.fast_path),
            max_conditional_steps: self
                .max_conditional_steps
                .unwrap_or(base.max_conditional_steps),
            default_error: self
                .default_error
                .clone()
                .or_else(|| base.default_error.clone()),
        }
    }
}

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgcastConfig {
    /// Version for future migration support
    #[serde(default = "default_version")]
    pub version: u32,

    /// Settings applied to every argument
    #[serde(default)]
    pub defaults: CastSettings,

    /// Per-argument overrides keyed by argument name
    #[serde(default)]
    pub arguments: BTreeMap<String, SettingsOverride>,
}

impl Default for ArgcastConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            defaults: CastSettings::default(),
            arguments: BTreeMap::new(),
        }
    }
}

impl ArgcastConfig {
    /// Platform config directory for argcast
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_ID))
    }

    /// Default config file path, falling back to the working directory
    pub fn default_path() -> PathBuf {
        Self::config_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ArgcastError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArgcastError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ArgcastError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ArgcastError::Config(format!("Failed to write config: {}", e)))
    }

    /// Effective settings for an argument
    pub fn settings_for(&self, argument: &str) -> CastSettings {
        match self.arguments.get(argument) {
            Some(overrides) => overrides.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }
}

/// One argument in a pipeline file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub steps: Chain,
    /// Overrides on top of the config's settings for this argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsOverride>,
}

/// A JSON file declaring the cast pipelines of a set of arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
}

impl PipelineFile {
    /// Load a pipeline file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;

        serde_json::from_str(&content).map_err(|e| {
            ArgcastError::Serialization(format!("Failed to parse pipeline file: {}", e))
        })
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ArgcastError::Serialization(format!("Failed to serialize pipeline file: {}", e))
        })?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| ArgcastError::Config(format!("Failed to write pipeline file: {}", e)))
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Declarations with settings resolved against `config`
    pub fn declarations(&self, config: &ArgcastConfig) -> Vec<ArgumentDeclaration> {
        self.arguments
            .iter()
            .map(|spec| {
                let base = config.settings_for(&spec.name);
                let settings = match &spec.settings {
                    Some(overrides) => overrides.apply(&base),
                    None => base,
                };
                ArgumentDeclaration::new(spec.name.clone(), spec.steps.clone())
                    .with_settings(settings)
            })
            .collect()
    }

    /// Compile every argument; the first configuration error aborts
    pub fn into_casts(&self, config: &ArgcastConfig) -> Result<Vec<ArgumentCast>> {
        self.declarations(config)
            .into_iter()
            .map(|decl| {
                let name = decl.name.clone();
                decl.into_cast().with_context(|| format!("Failed to compile argument '{}'", name))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_settings_defaults() {
        let settings = CastSettings::default();
        assert!(settings.forwarding);
        assert!(settings.fast_path);
        assert_eq!(settings.max_conditional_steps, 4);
        assert_eq!(settings.default_message(), MessageTemplate::invalid_argument());
    }

    #[test]
    fn test_default_message_placeholder() {
        let settings = CastSettings {
            default_error: Some("bad value for '%s'".to_string()),
            ..CastSettings::default()
        };
        let diag = settings.default_message().raise("n", false);
        assert_eq!(diag.render(), "bad value for 'n'");
    }

    #[test]
    fn test_overrides_apply_per_argument() {
        let mut config = ArgcastConfig::default();
        config.arguments.insert(
            "na.rm".to_string(),
            SettingsOverride {
                fast_path: Some(false),
                ..SettingsOverride::default()
            },
        );
        assert!(!config.settings_for("na.rm").fast_path);
        assert!(config.settings_for("na.rm").forwarding);
        assert!(config.settings_for("x").fast_path);
    }

    #[test]
    fn test_config_toml_partial() {
        let config: ArgcastConfig = toml::from_str(
            r#"
            [defaults]
            forwarding = false

            [arguments.digits]
            max_conditional_steps = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(!config.defaults.forwarding);
        assert!(config.defaults.fast_path);
        assert_eq!(config.settings_for("digits").max_conditional_steps, 1);
    }

    #[test]
    fn test_pipeline_file_json() {
        let file: PipelineFile = serde_json::from_str(
            r#"{
              "arguments": [
                {
                  "name": "x",
                  "steps": [
                    {"coercion": {"target": "double"}},
                    {"find_first": {"element_type": "double"}}
                  ]
                }
              ]
            }"#,
        )
        .unwrap();
        let spec = file.argument("x").unwrap();
        assert_eq!(spec.steps.len(), 2);
        assert!(file.argument("y").is_none());
    }
}
