//! Window source driven by a JSON description.
//!
//! Used by the integration tests, by `--fixture` on the command line and on
//! hosts without a native backend. The file looks like:
//!
//! ```json
//! {
//!   "windows": [
//!     { "handle": 4097, "title": "notes.txt - Notepad", "className": "Notepad", "ownerPid": 12 }
//!   ],
//!   "processes": { "12": "C:\\Windows\\System32\\notepad.exe" }
//! }
//! ```
//!
//! Clones share state, so a test can keep one clone and mutate the window
//! list while the service owns another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use super::{ProcessResolver, RawWindow, WindowSource};
use crate::error::PieslotError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureState {
    #[serde(default)]
    windows: Vec<RawWindow>,
    #[serde(default)]
    processes: HashMap<u32, PathBuf>,
}

/// In-memory window list.
#[derive(Debug, Clone, Default)]
pub struct FixtureWindowSource {
    state: Arc<RwLock<FixtureState>>,
}

impl FixtureWindowSource {
    /// Creates a source from explicit windows and a pid-to-executable map.
    #[must_use]
    pub fn new(windows: Vec<RawWindow>, processes: HashMap<u32, PathBuf>) -> Self {
        Self {
            state: Arc::new(RwLock::new(FixtureState { windows, processes })),
        }
    }

    /// Loads a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid fixture JSON.
    pub fn load(path: &Path) -> Result<Self, PieslotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|err| {
            PieslotError::InvalidArguments(format!("invalid fixture {}: {err}", path.display()))
        })
    }

    /// Parses fixture JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a fixture.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let state: FixtureState = serde_json::from_str(json)?;
        Ok(Self { state: Arc::new(RwLock::new(state)) })
    }

    /// Returns a process resolver backed by this fixture's process map.
    #[must_use]
    pub fn resolver(&self) -> FixtureProcessResolver {
        FixtureProcessResolver { state: Arc::clone(&self.state) }
    }

    /// Replaces the window list.
    pub fn set_windows(&self, windows: Vec<RawWindow>) { self.state.write().windows = windows; }

    /// Registers or replaces the executable of `pid`.
    pub fn set_process(&self, pid: u32, exe_path: impl Into<PathBuf>) {
        self.state.write().processes.insert(pid, exe_path.into());
    }
}

impl WindowSource for FixtureWindowSource {
    fn enumerate(&self) -> Vec<RawWindow> { self.state.read().windows.clone() }
}

/// Process resolver sharing a [`FixtureWindowSource`]'s process map.
#[derive(Debug, Clone)]
pub struct FixtureProcessResolver {
    state: Arc<RwLock<FixtureState>>,
}

impl ProcessResolver for FixtureProcessResolver {
    fn executable_path(&self, pid: u32) -> Option<PathBuf> {
        self.state.read().processes.get(&pid).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::engine::types::WindowHandle;

    const FIXTURE: &str = r#"{
        "windows": [
            { "handle": 16, "title": "notes.txt - Notepad", "className": "Notepad", "ownerPid": 12 },
            { "handle": 32, "title": "Inbox", "ownerPid": 13, "cloaked": true }
        ],
        "processes": { "12": "C:\\Windows\\notepad.exe" }
    }"#;

    #[test]
    fn test_parses_windows_and_processes() {
        let source = FixtureWindowSource::from_json(FIXTURE).unwrap();
        let windows = source.enumerate();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].handle, WindowHandle(16));
        assert!(windows[1].cloaked);

        let resolver = source.resolver();
        assert_eq!(resolver.executable_path(12), Some(PathBuf::from(r"C:\Windows\notepad.exe")));
        assert_eq!(resolver.executable_path(13), None);
    }

    #[test]
    fn test_clones_share_state() {
        let source = FixtureWindowSource::default();
        let shared = source.clone();
        let resolver = source.resolver();

        shared.set_windows(vec![RawWindow {
            handle: WindowHandle(5),
            visible: true,
            cloaked: false,
            title: "Doc".to_string(),
            class_name: String::new(),
            owner_pid: 1,
        }]);
        shared.set_process(1, "/usr/bin/editor");

        assert_eq!(source.enumerate().len(), 1);
        assert_eq!(resolver.executable_path(1), Some(PathBuf::from("/usr/bin/editor")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let source = FixtureWindowSource::load(file.path()).unwrap();
        assert_eq!(source.enumerate().len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = FixtureWindowSource::load(file.path()).unwrap_err();
        assert!(matches!(err, PieslotError::InvalidArguments(_)));
    }
}
