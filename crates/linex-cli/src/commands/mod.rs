//! CLI subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;
pub mod run;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use linex_core::models::LinexConfig;
use linex_core::{MessageSink, SqsSink};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linex")
        .join("config.json")
}

/// Resolve the config file to use: the explicit path, or the default one.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration.
///
/// An explicit path must exist; the default path is used only when present.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<LinexConfig> {
    match explicit {
        Some(path) => {
            let path = Path::new(path);
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Ok(LinexConfig::from_file(path)?)
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                Ok(LinexConfig::from_file(&path)?)
            } else {
                Ok(LinexConfig::default())
            }
        }
    }
}

/// Queue sink for the configured publisher, if a queue URL is set.
pub fn build_sink(config: &LinexConfig) -> anyhow::Result<Option<Box<dyn MessageSink>>> {
    if config.publisher.queue_url.is_empty() {
        return Ok(None);
    }

    let timeout = Duration::from_secs(config.analysis.request_timeout_secs);
    let sink = SqsSink::new(config.publisher.endpoint.clone(), timeout)?;
    Ok(Some(Box::new(sink)))
}
