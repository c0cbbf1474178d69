//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use pieslot_lib::engine::types::{ProgramWindowProperties, TaskProperties};
use pieslot_lib::engine::{
    AppInfoCache, CaptureFilter, LookupQueue, ReconciliationEngine, Slot, SlotAssignmentSnapshot, SlotRegistry,
    WindowHandle, WindowSnapshotProvider,
};
use pieslot_lib::platform::{FixtureWindowSource, RawWindow};
use pieslot_lib::service::Reconciler;

/// A visible top-level window owned by `pid`.
pub fn window(handle: i64, title: &str, pid: u32) -> RawWindow {
    RawWindow {
        handle: WindowHandle(handle),
        visible: true,
        cloaked: false,
        title: title.to_string(),
        class_name: "ApplicationFrameWindow".to_string(),
        owner_pid: pid,
    }
}

/// A fixture where pid `n` runs the executable `exes[n - 1]`.
pub fn desktop(exes: &[&str], windows: Vec<RawWindow>) -> FixtureWindowSource {
    let processes: HashMap<u32, PathBuf> = exes
        .iter()
        .zip(1u32..)
        .map(|(exe, pid)| (pid, PathBuf::from(format!("C:\\Program Files\\{exe}"))))
        .collect();
    FixtureWindowSource::new(windows, processes)
}

pub fn pinned(index: usize, exe_name: &str) -> Slot {
    Slot::new(index, TaskProperties::ShowProgramWindow(ProgramWindowProperties::pinned(exe_name)))
}

pub fn reconciler(source: &FixtureWindowSource, slots: Vec<Slot>) -> Reconciler {
    reconciler_with(source, slots, ReconciliationEngine::default())
}

pub fn reconciler_with(source: &FixtureWindowSource, slots: Vec<Slot>, engine: ReconciliationEngine) -> Reconciler {
    let provider = WindowSnapshotProvider::new(
        Box::new(source.clone()),
        Box::new(source.resolver()),
        CaptureFilter::new("Pieslot"),
        AppInfoCache::new(),
        LookupQueue::disabled(),
    );
    Reconciler::new(provider, engine, SlotRegistry::new(slots))
}

/// The window handle shown by `index`, sentinels included.
pub fn handle_of(snapshot: &SlotAssignmentSnapshot, index: usize) -> WindowHandle {
    snapshot
        .get(index)
        .and_then(|slot| slot.task.window_handle())
        .unwrap_or(WindowHandle::NONE)
}

/// The pinned executable of a program slot.
pub fn pinned_exe(snapshot: &SlotAssignmentSnapshot, index: usize) -> String {
    match snapshot.get(index).map(|slot| &slot.task) {
        Some(TaskProperties::ShowProgramWindow(props)) => props.exe_name.clone(),
        other => panic!("slot {index} is not a program slot: {other:?}"),
    }
}
