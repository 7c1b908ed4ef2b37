use promock_core::{MockError, Result};
use promock_model::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_METRICS_DIR: &str = "METRICS_DIR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_REFRESH_INTERVAL: &str = "REFRESH_INTERVAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_metrics_dir")]
    pub metrics_dir: PathBuf,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    #[serde(with = "humantime_serde", default = "default_refresh_interval")]
    pub refresh_interval: Duration,
    /// Extension of snapshot files, without the dot.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// TOML layout, where settings live under a `[service]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigFile {
    pub service: ServiceConfig,
}

fn default_metrics_dir() -> PathBuf {
    PathBuf::from("/metrics")
}

fn default_listen_port() -> u16 {
    9090
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_file_extension() -> String {
    "prom".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            metrics_dir: default_metrics_dir(),
            listen_port: default_listen_port(),
            refresh_interval: default_refresh_interval(),
            file_extension: default_file_extension(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Overlay `METRICS_DIR`, `PORT` and `REFRESH_INTERVAL` from the process
    /// environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup(ENV_METRICS_DIR) {
            self.metrics_dir = PathBuf::from(dir);
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.listen_port = port.trim().parse().map_err(|e| {
                MockError::InvalidConfig(format!("{}='{}': {}", ENV_PORT, port, e))
            })?;
        }

        if let Some(interval) = lookup(ENV_REFRESH_INTERVAL) {
            self.refresh_interval = humantime::parse_duration(interval.trim()).map_err(|e| {
                MockError::InvalidConfig(format!("{}='{}': {}", ENV_REFRESH_INTERVAL, interval, e))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.metrics_dir.as_os_str().is_empty() {
            return Err(MockError::InvalidConfig(
                "metrics_dir cannot be empty".to_string(),
            ));
        }

        if self.refresh_interval.is_zero() {
            return Err(MockError::InvalidConfig(
                "refresh_interval must be > 0".to_string(),
            ));
        }

        if self.file_extension.is_empty() || self.file_extension.starts_with('.') {
            return Err(MockError::InvalidConfig(format!(
                "file_extension must be non-empty and given without a dot, got '{}'",
                self.file_extension
            )));
        }

        self.generator.validate().map_err(MockError::InvalidConfig)
    }
}

#[derive(Default)]
pub struct ServiceConfigBuilder {
    metrics_dir: Option<PathBuf>,
    listen_port: Option<u16>,
    refresh_interval: Option<Duration>,
    file_extension: Option<String>,
    generator: Option<GeneratorConfig>,
}

impl ServiceConfigBuilder {
    pub fn metrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metrics_dir = Some(dir.into());
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.listen_port = Some(port);
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = Some(extension.into());
        self
    }

    pub fn generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn build(self) -> ServiceConfig {
        ServiceConfig {
            metrics_dir: self.metrics_dir.unwrap_or_else(default_metrics_dir),
            listen_port: self.listen_port.unwrap_or_else(default_listen_port),
            refresh_interval: self.refresh_interval.unwrap_or_else(default_refresh_interval),
            file_extension: self.file_extension.unwrap_or_else(default_file_extension),
            generator: self.generator.unwrap_or_default(),
        }
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
