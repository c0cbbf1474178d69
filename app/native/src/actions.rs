//! Acting on a chosen slot.
//!
//! The menu picks a slot from the published snapshot; [`resolve_action`]
//! turns it into a [`SlotAction`] and [`perform`] carries it out through the
//! window control, program launcher and function registry seams.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::engine::types::{Slot, TaskProperties, WindowHandle};
use crate::error::PieslotError;
use crate::platform::WindowControl;

/// What activating a slot does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotAction {
    /// Bring an open window to the front.
    FocusWindow(WindowHandle),
    /// Start a program.
    Launch(PathBuf),
    /// Run a registered function.
    CallFunction(String),
    /// The slot is empty.
    Nothing,
}

impl fmt::Display for SlotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FocusWindow(handle) => write!(f, "focus window {handle}"),
            Self::Launch(path) => write!(f, "launch {}", path.display()),
            Self::CallFunction(name) => write!(f, "call {name}"),
            Self::Nothing => f.write_str("nothing"),
        }
    }
}

/// Decides what activating `slot` does.
///
/// A pinned program without an open window is launched, from its recorded
/// path when known and by executable name otherwise.
#[must_use]
pub fn resolve_action(slot: &Slot) -> SlotAction {
    match &slot.task {
        TaskProperties::ShowAnyWindow(props) if props.window_handle.is_window() => {
            SlotAction::FocusWindow(props.window_handle)
        }
        TaskProperties::ShowAnyWindow(_) => SlotAction::Nothing,
        TaskProperties::ShowProgramWindow(props) if props.window_handle.is_window() => {
            SlotAction::FocusWindow(props.window_handle)
        }
        TaskProperties::ShowProgramWindow(props) => launch_target(props.exe_path.as_deref(), &props.exe_name),
        TaskProperties::LaunchProgram(props) => launch_target(props.exe_path.as_deref(), &props.exe_name),
        TaskProperties::CallFunction(props) => SlotAction::CallFunction(props.function_name.clone()),
    }
}

fn launch_target(exe_path: Option<&Path>, exe_name: &str) -> SlotAction {
    match exe_path {
        Some(path) if !path.as_os_str().is_empty() => SlotAction::Launch(path.to_path_buf()),
        _ if !exe_name.is_empty() => SlotAction::Launch(PathBuf::from(exe_name)),
        _ => SlotAction::Nothing,
    }
}

// ============================================================================
// Window commands
// ============================================================================

/// Operation applied to a slot's window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WindowCommand {
    #[default]
    Focus,
    Minimize,
    Maximize,
    Close,
}

impl WindowCommand {
    /// Applies this command to `handle`.
    ///
    /// # Errors
    ///
    /// Returns any error reported by `control`.
    pub fn apply(self, control: &dyn WindowControl, handle: WindowHandle) -> Result<(), PieslotError> {
        tracing::debug!(command = ?self, handle = %handle, "window command");
        match self {
            Self::Focus => control.focus(handle),
            Self::Minimize => control.minimize(handle),
            Self::Maximize => control.maximize(handle),
            Self::Close => control.close(handle),
        }
    }
}

// ============================================================================
// Launching
// ============================================================================

/// Starts programs.
pub trait ProgramLauncher {
    /// Starts the program at `path` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`PieslotError::LaunchError`] if the program cannot be started.
    fn launch(&self, path: &Path) -> Result<(), PieslotError>;
}

/// Launches programs as detached child processes.
#[derive(Debug, Default)]
pub struct CommandLauncher;

impl ProgramLauncher for CommandLauncher {
    fn launch(&self, path: &Path) -> Result<(), PieslotError> {
        let child = Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| PieslotError::LaunchError(format!("{}: {err}", path.display())))?;

        tracing::info!(path = %path.display(), pid = child.id(), "launched program");
        Ok(())
    }
}

// ============================================================================
// Functions
// ============================================================================

type SlotFunction = Box<dyn Fn() -> Result<(), PieslotError> + Send + Sync>;

/// Named callbacks that `callFunction` slots can run.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, SlotFunction>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `function` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where F: Fn() -> Result<(), PieslotError> + Send + Sync + 'static {
        self.functions.insert(name.into(), Box::new(function));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.functions.contains_key(name) }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the function registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PieslotError::UnknownFunction`] if nothing is registered
    /// under `name`, or the function's own error.
    pub fn call(&self, name: &str) -> Result<(), PieslotError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| PieslotError::UnknownFunction(name.to_string()))?;
        function()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry").field("functions", &self.names()).finish()
    }
}

/// Carries out `action`.
///
/// # Errors
///
/// Returns an error if the window operation, launch or function call fails.
pub fn perform(
    action: &SlotAction,
    control: &dyn WindowControl,
    launcher: &dyn ProgramLauncher,
    functions: &FunctionRegistry,
) -> Result<(), PieslotError> {
    match action {
        SlotAction::FocusWindow(handle) => WindowCommand::Focus.apply(control, *handle),
        SlotAction::Launch(path) => launcher.launch(path),
        SlotAction::CallFunction(name) => functions.call(name),
        SlotAction::Nothing => {
            tracing::debug!("activated an empty slot");
            Ok(())
        }
    }
}
