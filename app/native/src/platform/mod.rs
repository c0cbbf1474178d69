//! Platform abstractions for Pieslot.
//!
//! The engine only reads window identity and invokes window operations as
//! opaque calls. This module defines those seams and provides backends:
//!
//! - [`win32`] - live enumeration and control through the Win32 API
//! - [`fixture`] - windows described in a JSON file (tests, demos, non-Windows hosts)
//! - [`process`] - owning-process executable resolution via `sysinfo`
//! - [`thread`] - named background threads

pub mod fixture;
pub mod process;
pub mod thread;
#[cfg(target_os = "windows")]
pub mod win32;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

pub use fixture::FixtureWindowSource;
pub use process::SysinfoProcessResolver;

use crate::engine::types::WindowHandle;
use crate::error::PieslotError;

/// One OS top-level window as reported by enumeration, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWindow {
    pub handle: WindowHandle,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub cloaked: bool,
    pub title: String,
    #[serde(default)]
    pub class_name: String,
    pub owner_pid: u32,
}

const fn default_true() -> bool { true }

/// Source of the OS's live top-level window list.
pub trait WindowSource: Send {
    /// Enumerates all top-level windows, unfiltered.
    fn enumerate(&self) -> Vec<RawWindow>;
}

/// Resolves an owning process to its executable path.
pub trait ProcessResolver: Send {
    /// Returns the executable path of `pid`, or `None` if it cannot be read
    /// (access denied, process exited mid-scan).
    fn executable_path(&self, pid: u32) -> Option<PathBuf>;
}

/// Opaque window manipulation primitives.
pub trait WindowControl {
    /// Brings the window to the foreground, restoring it if minimized.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the request.
    fn focus(&self, handle: WindowHandle) -> Result<(), PieslotError>;

    /// Minimizes the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the request.
    fn minimize(&self, handle: WindowHandle) -> Result<(), PieslotError>;

    /// Maximizes the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the request.
    fn maximize(&self, handle: WindowHandle) -> Result<(), PieslotError>;

    /// Asks the window to close.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses the request.
    fn close(&self, handle: WindowHandle) -> Result<(), PieslotError>;
}

// ============================================================================
// Unsupported host
// ============================================================================

/// Window source for hosts without a native backend. Yields no windows.
#[derive(Debug, Default)]
pub struct UnsupportedWindowSource {
    warned: AtomicBool,
}

impl WindowSource for UnsupportedWindowSource {
    fn enumerate(&self) -> Vec<RawWindow> {
        if !self.warned.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                os = std::env::consts::OS,
                "window enumeration is not supported on this platform; use --fixture"
            );
        }
        Vec::new()
    }
}

/// Window control for hosts without a native backend.
#[derive(Debug, Default)]
pub struct UnsupportedWindowControl;

impl UnsupportedWindowControl {
    fn unsupported(operation: &str, handle: WindowHandle) -> Result<(), PieslotError> {
        Err(PieslotError::PlatformError(format!(
            "cannot {operation} window {handle}: window control is not supported on {}",
            std::env::consts::OS
        )))
    }
}

impl WindowControl for UnsupportedWindowControl {
    fn focus(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        Self::unsupported("focus", handle)
    }

    fn minimize(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        Self::unsupported("minimize", handle)
    }

    fn maximize(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        Self::unsupported("maximize", handle)
    }

    fn close(&self, handle: WindowHandle) -> Result<(), PieslotError> {
        Self::unsupported("close", handle)
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Creates the window source for this host.
///
/// A fixture file, when given, takes precedence over the native backend.
///
/// # Errors
///
/// Returns an error if the fixture file cannot be read or parsed.
pub fn create_window_source(
    fixture: Option<&Path>,
) -> Result<(Box<dyn WindowSource>, Box<dyn ProcessResolver>), PieslotError> {
    if let Some(path) = fixture {
        let source = FixtureWindowSource::load(path)?;
        let resolver = source.resolver();
        return Ok((Box::new(source), Box::new(resolver)));
    }

    #[cfg(target_os = "windows")]
    {
        Ok((
            Box::new(win32::Win32WindowSource),
            Box::new(SysinfoProcessResolver::new()),
        ))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Ok((
            Box::new(UnsupportedWindowSource::default()),
            Box::new(SysinfoProcessResolver::new()),
        ))
    }
}

/// Creates the window control backend for this host.
#[must_use]
pub fn create_window_control() -> Box<dyn WindowControl> {
    #[cfg(target_os = "windows")]
    {
        Box::new(win32::Win32WindowControl)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Box::new(UnsupportedWindowControl)
    }
}
