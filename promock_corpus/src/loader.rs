//! Reading a `ServiceConfig` from a YAML, TOML or JSON file.

use crate::config::{ServiceConfig, ServiceConfigFile};
use promock_core::{MockError, Result};
use std::path::Path;
use std::str::FromStr;

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        extension.parse().map_err(|_| {
            MockError::InvalidConfig(format!(
                "cannot tell the format of {}; expected a .yaml, .yml, .toml or .json file",
                path.display()
            ))
        })
    }

    /// Decode and validate settings. TOML keeps them under `[service]`.
    pub fn decode(self, content: &str) -> Result<ServiceConfig> {
        let config: ServiceConfig = match self {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| self.invalid(e))?,
            ConfigFormat::Toml => {
                toml::from_str::<ServiceConfigFile>(content)
                    .map_err(|e| self.invalid(e))?
                    .service
            }
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| self.invalid(e))?,
        };
        config.validate()?;
        Ok(config)
    }

    fn invalid(self, err: impl std::fmt::Display) -> MockError {
        MockError::InvalidConfig(format!("malformed {:?} settings: {}", self, err))
    }
}

impl FromStr for ConfigFormat {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            other => Err(MockError::InvalidConfig(format!(
                "unknown config format '{}'",
                other
            ))),
        }
    }
}

pub async fn load_config_from_file(path: impl AsRef<Path>) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path).await?;
    format.decode(&content)
}

pub fn parse_config_from_str(content: &str, format: &str) -> Result<ServiceConfig> {
    format.parse::<ConfigFormat>()?.decode(content)
}
