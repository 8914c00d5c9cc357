//! Configuration utilities
//!
//! Loads typed configuration from TOML, JSON or YAML (format picked by file
//! extension) and layers partial files over defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> crate::Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            _ => Err(crate::UtilError::Config(format!(
                "Unsupported config format: {}",
                extension
            ))),
        }
    }

    /// Parse text in this format into a JSON value tree
    fn parse_value(self, content: &str) -> crate::Result<serde_json::Value> {
        match self {
            Self::Toml => {
                let toml_value: toml::Value = toml::from_str(content)
                    .map_err(|e| crate::UtilError::Config(format!("TOML parse error: {}", e)))?;
                serde_json::to_value(toml_value)
                    .map_err(|e| crate::UtilError::Config(format!("TOML conversion error: {}", e)))
            }
            Self::Json => serde_json::from_str(content)
                .map_err(|e| crate::UtilError::Config(format!("JSON parse error: {}", e))),
            Self::Yaml => serde_yaml::from_str(content)
                .map_err(|e| crate::UtilError::Config(format!("YAML parse error: {}", e))),
        }
    }
}

/// Post-load validation hook for configuration types
pub trait ValidateConfig {
    /// Reject values that cannot work at runtime
    fn validate(&self) -> crate::Result<()> {
        Ok(())
    }
}

/// Merge two JSON values (second overrides first, objects merge key by key)
fn merge_json_values(base: &mut serde_json::Value, override_value: serde_json::Value) {
    match (base, override_value) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(override_obj)) => {
            for (key, value) in override_obj {
                match base_obj.get_mut(&key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_obj.insert(key, value);
                    }
                }
            }
        }
        (base_value, override_value) => {
            *base_value = override_value;
        }
    }
}

/// Load a complete configuration from file
pub fn load_config<T>(path: &Path) -> crate::Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    let value = format.parse_value(&content)?;

    serde_json::from_value(value)
        .map_err(|e| crate::UtilError::Config(format!("{}: {}", path.display(), e)))
}

/// Merge two configurations (second overrides first)
pub fn merge_configs<T>(base: &mut T, override_config: T) -> crate::Result<()>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let override_value = serde_json::to_value(override_config)
        .map_err(|e| crate::UtilError::Serialization(format!("Override serialization error: {}", e)))?;
    merge_value_into(base, override_value)
}

fn merge_value_into<T>(base: &mut T, override_value: serde_json::Value) -> crate::Result<()>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let mut base_value = serde_json::to_value(&*base)
        .map_err(|e| crate::UtilError::Serialization(format!("Base serialization error: {}", e)))?;

    merge_json_values(&mut base_value, override_value);

    *base = serde_json::from_value(base_value)
        .map_err(|e| crate::UtilError::Serialization(format!("Result deserialization error: {}", e)))?;

    Ok(())
}

/// Layered configuration: defaults, then any number of (possibly partial) files
#[derive(Debug)]
pub struct ConfigBuilder<T> {
    config: T,
}

impl<T> ConfigBuilder<T>
where
    T: Default + Serialize + for<'de> Deserialize<'de> + ValidateConfig,
{
    /// Create new config builder with defaults
    pub fn new() -> Self {
        Self {
            config: T::default(),
        }
    }

    /// Merge a file over the current values; keys missing from the file keep their value
    pub fn load_file(mut self, path: &Path) -> crate::Result<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let value = format.parse_value(&content)?;
        merge_value_into(&mut self.config, value)?;
        Ok(self)
    }

    /// Like `load_file`, but a missing path is not an error
    pub fn load_optional_file(self, path: Option<&Path>) -> crate::Result<Self> {
        match path {
            Some(path) if path.exists() => self.load_file(path),
            _ => Ok(self),
        }
    }

    /// Merge with another full config
    pub fn merge(mut self, other: T) -> crate::Result<Self> {
        merge_configs(&mut self.config, other)?;
        Ok(self)
    }

    /// Validate and build final config
    pub fn build(self) -> crate::Result<T> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl<T> Default for ConfigBuilder<T>
where
    T: Default + Serialize + for<'de> Deserialize<'de> + ValidateConfig,
{
    fn default() -> Self {
        Self::new()
    }
}
