//! Live window capture.
//!
//! Turns the OS window list into the filtered `(handle, title, exeName)` set the
//! rest of the pipeline works on.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::constants::UNKNOWN_APP;
use crate::engine::app_info::{AppInfoCache, LookupQueue};
use crate::engine::rules::{CaptureFilter, exe_name_from_path, normalize_title, should_include_window};
use crate::engine::types::{RawWindowSet, WindowHandle, WindowIdentity};
use crate::platform::{ProcessResolver, WindowSource};

/// Captures the filtered live window set from a [`WindowSource`].
pub struct WindowSnapshotProvider {
    source: Box<dyn WindowSource>,
    resolver: Box<dyn ProcessResolver>,
    filter: CaptureFilter,
    cache: AppInfoCache,
    lookups: LookupQueue,
}

impl WindowSnapshotProvider {
    #[must_use]
    pub fn new(
        source: Box<dyn WindowSource>,
        resolver: Box<dyn ProcessResolver>,
        filter: CaptureFilter,
        cache: AppInfoCache,
        lookups: LookupQueue,
    ) -> Self {
        Self { source, resolver, filter, cache, lookups }
    }

    /// Replaces the capture filter, e.g. after a configuration reload.
    pub fn set_filter(&mut self, filter: CaptureFilter) { self.filter = filter; }

    #[must_use]
    pub const fn filter(&self) -> &CaptureFilter { &self.filter }

    #[must_use]
    pub const fn cache(&self) -> &AppInfoCache { &self.cache }

    /// Enumerates, filters and identifies the current windows.
    ///
    /// Never fails: a window whose process cannot be resolved is kept with the
    /// executable name [`UNKNOWN_APP`].
    pub fn capture(
        &self,
        excluded_handles: &HashSet<WindowHandle>,
        self_handles: &HashSet<WindowHandle>,
    ) -> RawWindowSet {
        let mut processes: HashMap<u32, (String, Option<PathBuf>)> = HashMap::new();
        let mut windows = RawWindowSet::new();

        for window in self.source.enumerate() {
            if !should_include_window(&window, &self.filter, excluded_handles, self_handles) {
                continue;
            }

            let (exe_name, exe_path) = processes
                .entry(window.owner_pid)
                .or_insert_with(|| {
                    let path = self.resolver.executable_path(window.owner_pid);
                    if path.is_none() {
                        tracing::trace!(
                            pid = window.owner_pid,
                            handle = %window.handle,
                            "executable path unavailable"
                        );
                    }
                    (exe_name_from_path(path.as_deref()), path)
                })
                .clone();

            let app_name = if exe_name == UNKNOWN_APP {
                None
            } else {
                let cached = self.cache.lookup(&exe_name).map(|info| info.app_name);
                if cached.is_none() {
                    self.lookups.request(&exe_name, exe_path.as_deref());
                }
                cached
            };

            let title = normalize_title(&window.title, &exe_name, app_name.as_deref());
            windows.insert(window.handle, WindowIdentity::new(title, exe_name));
        }

        windows
    }
}

impl std::fmt::Debug for WindowSnapshotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSnapshotProvider")
            .field("filter", &self.filter)
            .field("cache_entries", &self.cache.len())
            .field("lookups", &self.lookups)
            .finish_non_exhaustive()
    }
}
