//! Core types shared by the capture, disambiguation and reconciliation stages.
//!
//! The model is split in two halves:
//! - Window identity (`WindowHandle`, `WindowIdentity`, `WindowInfo`) which is
//!   rebuilt from the OS every cycle.
//! - Slot definitions (`Slot`, `TaskProperties`, `SlotRegistry`) which come from
//!   configuration and only change out of band.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Window identity
// ============================================================================

/// Opaque identifier of one OS top-level window.
///
/// Two sentinel values are used inside slot properties:
/// - [`WindowHandle::NONE`] (`-1`): no window occupies the slot, or the slot
///   has not been evaluated yet.
/// - [`WindowHandle::IDLE`] (`0`): a pinned program has no open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub i64);

impl WindowHandle {
    /// No window assigned.
    pub const NONE: Self = Self(-1);

    /// Pinned program is not running.
    pub const IDLE: Self = Self(0);

    /// Returns the raw OS value.
    #[must_use]
    pub const fn raw(self) -> i64 { self.0 }

    /// Returns `true` if this refers to an actual window rather than a sentinel.
    #[must_use]
    pub const fn is_window(self) -> bool { self.0 > 0 }
}

impl Default for WindowHandle {
    fn default() -> Self { Self::NONE }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

/// The `(title, exeName)` pair that identifies a window across cycles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowIdentity {
    /// Normalized window title.
    pub title: String,
    /// Lower-cased executable file name (e.g. `notepad.exe`).
    pub exe_name: String,
}

impl WindowIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(title: impl Into<String>, exe_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            exe_name: exe_name.into(),
        }
    }
}

/// A live window with its disambiguated instance number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub title: String,
    pub exe_name: String,
    /// Dense index among windows sharing the same title and executable.
    pub instance_number: u32,
}

impl WindowInfo {
    /// Returns the identity pair of this window.
    #[must_use]
    pub fn identity(&self) -> WindowIdentity { WindowIdentity::new(&*self.title, &*self.exe_name) }

    /// Returns `true` if this window has the given identity.
    #[must_use]
    pub fn has_identity(&self, identity: &WindowIdentity) -> bool {
        self.title == identity.title && self.exe_name == identity.exe_name
    }
}

/// Filtered windows captured in one cycle, before instance numbers are assigned.
///
/// Ordered by handle so every consumer iterates deterministically.
pub type RawWindowSet = BTreeMap<WindowHandle, WindowIdentity>;

/// Every currently visible, non-excluded window, keyed by handle.
///
/// Rebuilt wholesale each cycle.
pub type LiveWindowSet = BTreeMap<WindowHandle, WindowInfo>;

// ============================================================================
// Slots
// ============================================================================

/// Kind of task a slot performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskType {
    ShowAnyWindow,
    ShowProgramWindow,
    LaunchProgram,
    CallFunction,
}

impl TaskType {
    /// Parses a configured task type name.
    ///
    /// Accepts camelCase (`showAnyWindow`), snake_case (`show_any_window`) and
    /// PascalCase (`ShowAnyWindow`) spellings.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let folded: String =
            name.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_lowercase();
        match folded.as_str() {
            "showanywindow" => Some(Self::ShowAnyWindow),
            "showprogramwindow" => Some(Self::ShowProgramWindow),
            "launchprogram" => Some(Self::LaunchProgram),
            "callfunction" => Some(Self::CallFunction),
            _ => None,
        }
    }

    /// Returns the canonical name of this task type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShowAnyWindow => "showAnyWindow",
            Self::ShowProgramWindow => "showProgramWindow",
            Self::LaunchProgram => "launchProgram",
            Self::CallFunction => "callFunction",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Properties of a slot that shows whichever window is left over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnyWindowProperties {
    pub window_handle: WindowHandle,
    pub window_title: String,
    pub instance_number: u32,
    pub exe_name: String,
    pub app_name: String,
    pub app_icon_path: Option<PathBuf>,
}

impl AnyWindowProperties {
    /// Resets the slot to the unassigned state.
    pub fn clear(&mut self) { *self = Self::default(); }
}

/// Properties of a slot pinned to one executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramWindowProperties {
    #[serde(default)]
    pub window_handle: WindowHandle,
    #[serde(default)]
    pub window_title: String,
    #[serde(default)]
    pub instance_number: u32,
    /// Pinned executable. Never changed by reconciliation.
    pub exe_name: String,
    #[serde(default)]
    pub exe_path: Option<PathBuf>,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub app_icon_path: Option<PathBuf>,
}

impl ProgramWindowProperties {
    /// Creates an unevaluated slot pinned to `exe_name`.
    #[must_use]
    pub fn pinned(exe_name: impl Into<String>) -> Self {
        Self {
            window_handle: WindowHandle::NONE,
            window_title: String::new(),
            instance_number: 0,
            exe_name: exe_name.into(),
            exe_path: None,
            app_name: String::new(),
            app_icon_path: None,
        }
    }
}

/// Properties of a slot that starts a program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchProgramProperties {
    pub exe_name: String,
    pub exe_path: Option<PathBuf>,
    pub app_name: String,
    pub app_icon_path: Option<PathBuf>,
}

/// Properties of a slot bound to a named function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFunctionProperties {
    pub function_name: String,
}

/// Type-specific slot payload, tagged by [`TaskType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "taskType", content = "properties", rename_all = "camelCase")]
pub enum TaskProperties {
    ShowAnyWindow(AnyWindowProperties),
    ShowProgramWindow(ProgramWindowProperties),
    LaunchProgram(LaunchProgramProperties),
    CallFunction(CallFunctionProperties),
}

impl TaskProperties {
    /// Returns the task type tag.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        match self {
            Self::ShowAnyWindow(_) => TaskType::ShowAnyWindow,
            Self::ShowProgramWindow(_) => TaskType::ShowProgramWindow,
            Self::LaunchProgram(_) => TaskType::LaunchProgram,
            Self::CallFunction(_) => TaskType::CallFunction,
        }
    }

    /// Returns the window handle held by window-showing slots.
    #[must_use]
    pub const fn window_handle(&self) -> Option<WindowHandle> {
        match self {
            Self::ShowAnyWindow(props) => Some(props.window_handle),
            Self::ShowProgramWindow(props) => Some(props.window_handle),
            Self::LaunchProgram(_) | Self::CallFunction(_) => None,
        }
    }
}

/// A configured, index-addressed position in the pie menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub index: usize,
    #[serde(flatten)]
    pub task: TaskProperties,
}

impl Slot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(index: usize, task: TaskProperties) -> Self { Self { index, task } }

    /// Creates an unassigned "any window" slot.
    #[must_use]
    pub fn any_window(index: usize) -> Self {
        Self::new(index, TaskProperties::ShowAnyWindow(AnyWindowProperties::default()))
    }

    /// Returns the task type of this slot.
    #[must_use]
    pub const fn task_type(&self) -> TaskType { self.task.task_type() }

    /// Returns the assigned window handle, if this slot shows a real window.
    #[must_use]
    pub fn assigned_window(&self) -> Option<WindowHandle> {
        self.task.window_handle().filter(|handle| handle.is_window())
    }
}

/// Ordered list of configured slots.
///
/// Read-only to the engine. Replaced wholesale by the configuration layer; the
/// revision counter lets the service detect replacements and force a full pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
    revision: u64,
}

impl SlotRegistry {
    /// Creates a registry, re-indexing slots by position.
    #[must_use]
    pub fn new(slots: Vec<Slot>) -> Self {
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| Slot { index, ..slot })
            .collect();
        Self { slots, revision: 0 }
    }

    /// Returns the slots in index order.
    #[must_use]
    pub fn get_slots(&self) -> &[Slot] { &self.slots }

    /// Returns the slot at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Slot> { self.slots.get(index) }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize { self.slots.len() }

    /// Returns `true` if no slots are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Revision of this registry. Bumped by [`Self::succeed`].
    #[must_use]
    pub const fn revision(&self) -> u64 { self.revision }

    /// Returns `next` stamped with a revision newer than `self`.
    #[must_use]
    pub fn succeed(&self, mut next: Self) -> Self {
        next.revision = self.revision + 1;
        next
    }
}

/// The engine's output: one full, updated copy of every slot.
///
/// Immutable once published; each cycle produces a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SlotAssignmentSnapshot {
    slots: BTreeMap<usize, Slot>,
}

impl SlotAssignmentSnapshot {
    /// Builds a snapshot holding the registry's slot definitions as-is.
    #[must_use]
    pub fn from_registry(registry: &SlotRegistry) -> Self {
        registry.get_slots().iter().cloned().collect()
    }

    /// Returns the slot at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Slot> { self.slots.get(&index) }

    /// Iterates slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> { self.slots.values() }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize { self.slots.len() }

    /// Returns `true` if the snapshot holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Returns the slot index currently showing `handle`.
    #[must_use]
    pub fn slot_of(&self, handle: WindowHandle) -> Option<usize> {
        self.slots
            .values()
            .find(|slot| slot.assigned_window() == Some(handle))
            .map(|slot| slot.index)
    }
}

impl FromIterator<Slot> for SlotAssignmentSnapshot {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(|slot| (slot.index, slot)).collect(),
        }
    }
}
