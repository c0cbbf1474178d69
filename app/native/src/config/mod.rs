//! Configuration module for Pieslot.
//!
//! This module provides configuration types, loading functionality, and file watching
//! for hot-reloading configuration changes.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod types;
mod watcher;

use std::path::{Path, PathBuf};

pub use types::{
    ConfigError, DEFAULT_REFRESH_INTERVAL_MS, PieslotConfig, SlotConfig, SlotConfigError, config_paths,
    find_config_path, load_config, load_config_from_path, parse_config,
};
pub use watcher::watch_config_file;

/// A loaded configuration and the file it belongs to.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: PieslotConfig,
    /// File to watch for changes. Set even when the file could not be parsed,
    /// so fixing it takes effect without a restart.
    pub path: Option<PathBuf>,
}

/// Loads the configuration, falling back to defaults.
///
/// `custom` replaces the search paths. A missing file yields the defaults; an
/// unreadable or invalid file yields the defaults and a warning.
#[must_use]
pub fn load_or_default(custom: Option<&Path>) -> LoadedConfig {
    let Some(path) = custom.map(Path::to_path_buf).or_else(find_config_path) else {
        tracing::debug!("no configuration file found, using defaults");
        return LoadedConfig::default();
    };

    match load_config_from_path(&path) {
        Ok((config, path)) => {
            tracing::info!(path = %path.display(), slots = config.slots.len(), "loaded configuration");
            LoadedConfig { config, path: Some(path) }
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!(path = %path.display(), "configuration file does not exist, using defaults");
            LoadedConfig { config: PieslotConfig::default(), path: Some(path) }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to load configuration, using defaults");
            LoadedConfig { config: PieslotConfig::default(), path: Some(path) }
        }
    }
}
