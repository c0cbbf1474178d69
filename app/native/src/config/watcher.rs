//! Configuration file watcher for hot-reloading.
//!
//! The parent directory is watched rather than the file itself so editors
//! that save by writing a temp file and renaming it are still noticed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::types::{ConfigError, PieslotConfig, load_config_from_path};
use crate::platform::thread::spawn_named_thread;

/// Quiet period after the last change before the file is re-read.
/// Some editors trigger multiple events per save.
const CONFIG_DEBOUNCE_MS: u64 = 200;

/// Watches `path` and calls `on_change` with each successfully reloaded
/// configuration.
///
/// Runs on a background thread for the life of the process. A file that
/// fails to parse is reported and skipped; the last good configuration
/// stays in effect.
pub fn watch_config_file<F>(path: PathBuf, on_change: F)
where F: Fn(PieslotConfig) + Send + 'static {
    spawn_named_thread("config-watcher", move || run_watcher(&path, &on_change));
}

fn run_watcher(path: &Path, on_change: &dyn Fn(PieslotConfig)) {
    let Some(file_name) = path.file_name().map(OsString::from) else {
        tracing::warn!(path = %path.display(), "config path has no file name, not watching");
        return;
    };

    let (tx, rx) = mpsc::channel();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(tx) {
        Ok(watcher) => watcher,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create config watcher");
            return;
        }
    };

    let watch_path = path.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));

    if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
        tracing::warn!(path = %watch_path.display(), error = %err, "failed to watch config directory");
        return;
    }

    tracing::debug!(path = %path.display(), "watching configuration file");
    let debounce = Duration::from_millis(CONFIG_DEBOUNCE_MS);

    // Ends when the watcher drops its sender.
    while let Ok(result) = rx.recv() {
        match result {
            Ok(event) if affects_file(&event, &file_name) => {
                while rx.recv_timeout(debounce).is_ok() {}

                if let Some(config) = reload(path) {
                    on_change(config);
                }
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "config watch error"),
        }
    }
}

/// Returns `true` if `event` touches a file named `file_name`.
fn affects_file(event: &Event, file_name: &OsString) -> bool {
    event.paths.iter().any(|p| p.file_name().is_some_and(|name| name == file_name))
}

fn reload(path: &Path) -> Option<PieslotConfig> {
    match load_config_from_path(path) {
        Ok((config, _)) => {
            tracing::info!(path = %path.display(), slots = config.slots.len(), "configuration reloaded");
            Some(config)
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!(path = %path.display(), "configuration file removed, keeping current settings");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid configuration change");
            None
        }
    }
}
