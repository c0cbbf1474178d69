//! Slot reconciliation.
//!
//! Matches the live window set against the configured slots and produces a
//! new [`SlotAssignmentSnapshot`]. Slots are processed in three waves that
//! share one pool of unclaimed windows:
//!
//! 1. `LaunchProgram` slots refresh their app info. They never take windows.
//! 2. `ShowProgramWindow` slots claim windows of their pinned executable.
//! 3. `ShowAnyWindow` slots take whatever is left, lowest handle first.
//!
//! Pinned slots run first so an "any window" slot never takes a window that a
//! pinned slot could show. Within waves 2 and 3 every slot first tries to keep
//! the window it already held; only then do the empty slots fill, in index
//! order. A window that stays live and keeps matching never moves.
//!
//! # Side table
//!
//! The engine remembers `handle -> slot index` across cycles. Entries for live
//! handles always mirror the last committed snapshot. Entries for closed
//! windows are left in place until the table grows past the eviction
//! threshold, at which point every entry whose handle is no longer live is
//! dropped in one sweep. The previous snapshot, not the table, says which
//! window a slot holds: a closed window that comes back does not reclaim a
//! slot that has since been refilled.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use crate::engine::app_info::AppInfoCache;
use crate::engine::rules::display_name_from_exe;
use crate::engine::types::{
    AnyWindowProperties, LaunchProgramProperties, LiveWindowSet, ProgramWindowProperties, Slot,
    SlotAssignmentSnapshot, SlotRegistry, TaskProperties, WindowHandle, WindowInfo,
};
use crate::error::ReconcileError;

/// Side-table size above which stale entries are swept.
pub const DEFAULT_EVICTION_THRESHOLD: usize = 64;

/// Stateful slot matcher.
#[derive(Debug)]
pub struct ReconciliationEngine {
    claims: BTreeMap<WindowHandle, usize>,
    eviction_threshold: usize,
    #[cfg(test)]
    drop_last_slot: Option<std::sync::Arc<std::sync::atomic::AtomicBool>>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self { Self::new(DEFAULT_EVICTION_THRESHOLD) }
}

impl ReconciliationEngine {
    #[must_use]
    pub const fn new(eviction_threshold: usize) -> Self {
        Self {
            claims: BTreeMap::new(),
            eviction_threshold,
            #[cfg(test)]
            drop_last_slot: None,
        }
    }

    /// While `switch` is set, every pass loses its last slot and fails
    /// [`check_invariants`].
    #[cfg(test)]
    pub(crate) fn corrupt_while(&mut self, switch: std::sync::Arc<std::sync::atomic::AtomicBool>) {
        self.drop_last_slot = Some(switch);
    }

    #[must_use]
    pub const fn eviction_threshold(&self) -> usize { self.eviction_threshold }

    pub const fn set_eviction_threshold(&mut self, threshold: usize) {
        self.eviction_threshold = threshold;
    }

    /// Number of side-table entries, including ones for closed windows.
    #[must_use]
    pub fn claims_len(&self) -> usize { self.claims.len() }

    /// Slot index last recorded for `handle`.
    #[must_use]
    pub fn claim_of(&self, handle: WindowHandle) -> Option<usize> { self.claims.get(&handle).copied() }

    /// Runs one reconciliation pass.
    ///
    /// The side table is only updated when the result passes
    /// [`check_invariants`]; a rejected pass leaves the engine as it was.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError`] if the produced snapshot is inconsistent.
    pub fn reconcile(
        &mut self,
        live: &LiveWindowSet,
        registry: &SlotRegistry,
        cache: &AppInfoCache,
        previous: &SlotAssignmentSnapshot,
    ) -> Result<SlotAssignmentSnapshot, ReconcileError> {
        let held = self.held_handles(live, registry, previous);
        let mut pool: BTreeSet<WindowHandle> = live.keys().copied().collect();
        let mut slots: Vec<Slot> = registry.get_slots().to_vec();

        for slot in &mut slots {
            if let TaskProperties::LaunchProgram(props) = &mut slot.task {
                refresh_launch_program(props, cache);
            }
        }

        reconcile_program_windows(&mut slots, &held, live, &mut pool, cache);
        reconcile_any_windows(&mut slots, &held, live, &mut pool, cache);

        #[cfg(test)]
        if self.drop_last_slot.as_ref().is_some_and(|switch| switch.load(std::sync::atomic::Ordering::SeqCst)) {
            slots.pop();
        }

        let snapshot: SlotAssignmentSnapshot = slots.into_iter().collect();
        check_invariants(&snapshot, live, registry)?;

        self.commit(&snapshot, live);

        tracing::trace!(
            slots = snapshot.len(),
            live = live.len(),
            unclaimed = pool.len(),
            claims = self.claims.len(),
            "reconciled"
        );

        Ok(snapshot)
    }

    /// The handle each slot held going into this pass, if it is still live.
    ///
    /// The previous snapshot decides, falling back to the registry's own
    /// value when the previous snapshot has no compatible slot at that index.
    /// A handle the side table attributes to another slot is not held; a
    /// side-table entry alone never puts a handle back into a slot.
    fn held_handles(
        &self,
        live: &LiveWindowSet,
        registry: &SlotRegistry,
        previous: &SlotAssignmentSnapshot,
    ) -> HashMap<usize, WindowHandle> {
        let mut held: HashMap<usize, WindowHandle> = HashMap::new();
        let mut taken: HashSet<WindowHandle> = HashSet::new();

        for slot in registry.get_slots() {
            let candidate = match previous.get(slot.index).filter(|p| p.task_type() == slot.task_type()) {
                Some(prior) => prior.assigned_window(),
                None => slot.assigned_window(),
            };

            let Some(handle) = candidate else {
                continue;
            };

            let claimed_elsewhere = self.claims.get(&handle).is_some_and(|index| *index != slot.index);
            if live.contains_key(&handle) && !claimed_elsewhere && taken.insert(handle) {
                held.insert(slot.index, handle);
            }
        }

        held
    }

    fn commit(&mut self, snapshot: &SlotAssignmentSnapshot, live: &LiveWindowSet) {
        self.claims.retain(|handle, _| !live.contains_key(handle));
        for slot in snapshot.iter() {
            if let Some(handle) = slot.assigned_window() {
                self.claims.insert(handle, slot.index);
            }
        }

        if self.claims.len() > self.eviction_threshold {
            let before = self.claims.len();
            self.claims.retain(|handle, _| live.contains_key(handle));
            tracing::debug!(
                evicted = before - self.claims.len(),
                remaining = self.claims.len(),
                threshold = self.eviction_threshold,
                "swept stale slot claims"
            );
        }
    }
}

// ============================================================================
// Waves
// ============================================================================

fn reconcile_program_windows(
    slots: &mut [Slot],
    held: &HashMap<usize, WindowHandle>,
    live: &LiveWindowSet,
    pool: &mut BTreeSet<WindowHandle>,
    cache: &AppInfoCache,
) {
    let mut unfilled: Vec<usize> = Vec::new();

    for slot in slots.iter_mut() {
        let index = slot.index;
        let TaskProperties::ShowProgramWindow(props) = &mut slot.task else {
            continue;
        };

        let kept = held.get(&index).copied().filter(|handle| {
            pool.contains(handle) && live.get(handle).is_some_and(|info| runs_exe(info, &props.exe_name))
        });

        match kept {
            Some(handle) => {
                pool.remove(&handle);
                show_program_window(props, handle, &live[&handle], cache);
            }
            None => unfilled.push(index),
        }
    }

    for index in unfilled {
        let Some(TaskProperties::ShowProgramWindow(props)) = slots.get_mut(index).map(|s| &mut s.task) else {
            continue;
        };

        let found = pool
            .iter()
            .copied()
            .find(|handle| live.get(handle).is_some_and(|info| runs_exe(info, &props.exe_name)));

        if let Some(handle) = found {
            pool.remove(&handle);
            tracing::debug!(slot = index, handle = %handle, exe = %props.exe_name, "pinned slot acquired window");
            show_program_window(props, handle, &live[&handle], cache);
        } else {
            idle_program_window(props, cache);
        }
    }
}

fn reconcile_any_windows(
    slots: &mut [Slot],
    held: &HashMap<usize, WindowHandle>,
    live: &LiveWindowSet,
    pool: &mut BTreeSet<WindowHandle>,
    cache: &AppInfoCache,
) {
    let mut unfilled: Vec<usize> = Vec::new();

    for slot in slots.iter_mut() {
        let index = slot.index;
        let TaskProperties::ShowAnyWindow(props) = &mut slot.task else {
            continue;
        };

        match held.get(&index).copied().filter(|handle| pool.remove(handle)) {
            Some(handle) => show_any_window(props, handle, &live[&handle], cache),
            None => unfilled.push(index),
        }
    }

    for index in unfilled {
        let Some(TaskProperties::ShowAnyWindow(props)) = slots.get_mut(index).map(|s| &mut s.task) else {
            continue;
        };

        match pool.pop_first() {
            Some(handle) => show_any_window(props, handle, &live[&handle], cache),
            None => props.clear(),
        }
    }
}

// ============================================================================
// Slot updates
// ============================================================================

fn runs_exe(info: &WindowInfo, exe_name: &str) -> bool { info.exe_name.eq_ignore_ascii_case(exe_name) }

struct AppDisplay {
    app_name: String,
    icon_path: Option<PathBuf>,
    exe_path: Option<PathBuf>,
}

fn app_display(cache: &AppInfoCache, exe_name: &str) -> AppDisplay {
    match cache.lookup(exe_name) {
        Some(info) if !info.app_name.is_empty() => AppDisplay {
            app_name: info.app_name,
            icon_path: info.icon_path,
            exe_path: info.exe_path,
        },
        cached => AppDisplay {
            app_name: display_name_from_exe(exe_name),
            icon_path: cached.as_ref().and_then(|info| info.icon_path.clone()),
            exe_path: cached.and_then(|info| info.exe_path),
        },
    }
}

fn refresh_launch_program(props: &mut LaunchProgramProperties, cache: &AppInfoCache) {
    let display = app_display(cache, &props.exe_name);
    props.app_name = display.app_name;
    props.app_icon_path = display.icon_path;
    if props.exe_path.is_none() {
        props.exe_path = display.exe_path;
    }
}

fn show_program_window(
    props: &mut ProgramWindowProperties,
    handle: WindowHandle,
    info: &WindowInfo,
    cache: &AppInfoCache,
) {
    props.window_handle = handle;
    props.window_title.clone_from(&info.title);
    props.instance_number = info.instance_number;
    refresh_program_app(props, cache);
}

fn idle_program_window(props: &mut ProgramWindowProperties, cache: &AppInfoCache) {
    props.window_handle = WindowHandle::IDLE;
    props.window_title.clear();
    props.instance_number = 0;
    refresh_program_app(props, cache);
}

fn refresh_program_app(props: &mut ProgramWindowProperties, cache: &AppInfoCache) {
    let display = app_display(cache, &props.exe_name);
    props.app_name = display.app_name;
    props.app_icon_path = display.icon_path;
    if props.exe_path.is_none() {
        props.exe_path = display.exe_path;
    }
}

fn show_any_window(props: &mut AnyWindowProperties, handle: WindowHandle, info: &WindowInfo, cache: &AppInfoCache) {
    let display = app_display(cache, &info.exe_name);
    props.window_handle = handle;
    props.window_title.clone_from(&info.title);
    props.instance_number = info.instance_number;
    props.exe_name.clone_from(&info.exe_name);
    props.app_name = display.app_name;
    props.app_icon_path = display.icon_path;
}

// ============================================================================
// Invariants
// ============================================================================

/// Verifies a snapshot before it may be published.
///
/// Checks that the snapshot covers every registry slot, that each assigned
/// handle is live and held by exactly one slot, and that pinned slots still
/// carry their configured executable.
///
/// # Errors
///
/// Returns the first violation found.
pub fn check_invariants(
    snapshot: &SlotAssignmentSnapshot,
    live: &LiveWindowSet,
    registry: &SlotRegistry,
) -> Result<(), ReconcileError> {
    if snapshot.len() != registry.len() {
        return Err(ReconcileError::SlotCountMismatch {
            expected: registry.len(),
            actual: snapshot.len(),
        });
    }

    let mut owners: HashMap<WindowHandle, usize> = HashMap::new();
    for slot in snapshot.iter() {
        let Some(handle) = slot.assigned_window() else {
            continue;
        };

        if !live.contains_key(&handle) {
            return Err(ReconcileError::StaleAssignment { slot: slot.index, handle });
        }

        if let Some(first) = owners.insert(handle, slot.index) {
            return Err(ReconcileError::DuplicateAssignment {
                handle,
                first,
                second: slot.index,
            });
        }
    }

    for configured in registry.get_slots() {
        let TaskProperties::ShowProgramWindow(expected) = &configured.task else {
            continue;
        };

        let actual = match snapshot.get(configured.index).map(|slot| &slot.task) {
            Some(TaskProperties::ShowProgramWindow(actual)) => actual.exe_name.as_str(),
            _ => "",
        };

        if actual != expected.exe_name {
            return Err(ReconcileError::PinnedExeChanged {
                slot: configured.index,
                expected: expected.exe_name.clone(),
                actual: actual.to_string(),
            });
        }
    }

    Ok(())
}
