//! Friendly names and icons for executables.
//!
//! The cache is read on every cycle and filled out of band: the capture path
//! queues a lookup the first time it sees an executable, a background thread
//! resolves it, and the result shows up on a later cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};

use dashmap::{DashMap, DashSet};

use crate::engine::rules::display_name_from_exe;
use crate::platform::thread::spawn_named_thread;

/// Resolved presentation data for one executable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppInfo {
    pub app_name: String,
    pub icon_path: Option<PathBuf>,
    pub exe_path: Option<PathBuf>,
}

/// Shared `exeName -> AppInfo` map.
///
/// Cloning is cheap; all clones see the same entries. The generation counter
/// moves on every insert, including overwrites of an existing entry.
#[derive(Debug, Clone, Default)]
pub struct AppInfoCache {
    entries: Arc<DashMap<String, AppInfo>>,
    generation: Arc<AtomicU64>,
}

impl AppInfoCache {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the cached entry for `exe_name`.
    #[must_use]
    pub fn lookup(&self, exe_name: &str) -> Option<AppInfo> {
        self.entries.get(exe_name).map(|entry| entry.value().clone())
    }

    /// Adds or replaces an entry.
    pub fn insert(&self, exe_name: impl Into<String>, info: AppInfo) {
        self.entries.insert(exe_name.into(), info);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of inserts so far.
    #[must_use]
    pub fn generation(&self) -> u64 { self.generation.load(Ordering::Acquire) }

    #[must_use]
    pub fn contains(&self, exe_name: &str) -> bool { self.entries.contains_key(exe_name) }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Produces [`AppInfo`] for an executable. May block.
pub trait AppInfoResolver: Send + 'static {
    fn resolve(&self, exe_name: &str, exe_path: Option<&Path>) -> AppInfo;
}

/// Derives the app name from the executable stem. Does not extract icons.
#[derive(Debug, Default)]
pub struct ExeStemResolver;

impl AppInfoResolver for ExeStemResolver {
    fn resolve(&self, exe_name: &str, exe_path: Option<&Path>) -> AppInfo {
        AppInfo {
            app_name: display_name_from_exe(exe_name),
            icon_path: None,
            exe_path: exe_path.map(Path::to_path_buf),
        }
    }
}

struct LookupRequest {
    exe_name: String,
    exe_path: Option<PathBuf>,
}

/// Non-blocking queue of first-sight lookups.
#[derive(Clone)]
pub struct LookupQueue {
    requested: Arc<DashSet<String>>,
    sender: Option<Sender<LookupRequest>>,
}

impl LookupQueue {
    /// Starts the `pieslot-app-info` worker that fills `cache`.
    #[must_use]
    pub fn spawn(cache: AppInfoCache, resolver: Box<dyn AppInfoResolver>) -> Self {
        let (sender, receiver) = mpsc::channel::<LookupRequest>();

        spawn_named_thread("app-info", move || {
            while let Ok(request) = receiver.recv() {
                let info = resolver.resolve(&request.exe_name, request.exe_path.as_deref());
                tracing::debug!(
                    exe = %request.exe_name,
                    app_name = %info.app_name,
                    "resolved app info"
                );
                cache.insert(request.exe_name, info);
            }
        });

        Self {
            requested: Arc::new(DashSet::new()),
            sender: Some(sender),
        }
    }

    /// A queue that records requests but never resolves them.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            requested: Arc::new(DashSet::new()),
            sender: None,
        }
    }

    /// Queues a lookup for `exe_name` unless one was already queued.
    ///
    /// Returns `true` if this was the first request for `exe_name`.
    pub fn request(&self, exe_name: &str, exe_path: Option<&Path>) -> bool {
        if !self.requested.insert(exe_name.to_string()) {
            return false;
        }

        tracing::debug!(exe = %exe_name, "first sight, queueing app info lookup");

        if let Some(sender) = &self.sender {
            let request = LookupRequest {
                exe_name: exe_name.to_string(),
                exe_path: exe_path.map(Path::to_path_buf),
            };
            if sender.send(request).is_err() {
                tracing::warn!(exe = %exe_name, "app info worker has stopped");
            }
        }

        true
    }

    /// Number of distinct executables requested so far.
    #[must_use]
    pub fn requested_count(&self) -> usize { self.requested.len() }
}

impl std::fmt::Debug for LookupQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupQueue")
            .field("requested", &self.requested.len())
            .field("background", &self.sender.is_some())
            .finish()
    }
}
