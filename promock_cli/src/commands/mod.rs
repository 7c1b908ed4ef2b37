pub mod inspect;
pub mod render;
pub mod serve;
pub mod validate;

use crate::SourceArgs;
use anyhow::Result;
use promock_corpus::{load_config_from_file, ServiceConfig};

/// Defaults, then the config file, then the environment, then flags.
pub async fn load_config(source: &SourceArgs) -> Result<ServiceConfig> {
    let mut config = match &source.config {
        Some(path) => load_config_from_file(path).await?,
        None => ServiceConfig::default(),
    };
    config.apply_env()?;
    if let Some(dir) = &source.dir {
        config.metrics_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}
