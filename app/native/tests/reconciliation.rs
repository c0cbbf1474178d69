//! End-to-end reconciliation tests.
//!
//! Each test drives the full capture -> instances -> reconcile -> publish
//! pipeline against a fixture desktop.

mod common;

use std::collections::{BTreeSet, HashSet};

use common::{desktop, handle_of, pinned, pinned_exe, reconciler, reconciler_with, window};
use pieslot_lib::config::parse_config;
use pieslot_lib::engine::types::TaskProperties;
use pieslot_lib::engine::{ReconciliationEngine, Slot, WindowHandle};
use pieslot_lib::service::CycleOutcome;

#[test]
fn pinned_and_any_slots_follow_windows_across_cycles() {
    let source = desktop(&["a.exe", "b.exe"], vec![window(1, "Doc1", 1), window(2, "Doc2", 2)]);
    let mut reconciler = reconciler(&source, vec![pinned(0, "a.exe"), Slot::any_window(1)]);

    reconciler.run_cycle();
    let first = reconciler.current();
    assert_eq!(handle_of(&first, 0), WindowHandle(1));
    assert_eq!(handle_of(&first, 1), WindowHandle(2));

    source.set_windows(vec![window(2, "Doc2", 2), window(3, "Doc3", 1)]);
    reconciler.run_cycle();

    let second = reconciler.current();
    assert_eq!(handle_of(&second, 0), WindowHandle(3));
    assert_eq!(pinned_exe(&second, 0), "a.exe");
    assert_eq!(handle_of(&second, 1), WindowHandle(2));
}

#[test]
fn pinned_slot_wins_over_earlier_any_slot() {
    let source = desktop(&["y.exe"], vec![window(7, "Report", 1)]);
    let mut reconciler = reconciler(&source, vec![Slot::any_window(0), pinned(1, "y.exe")]);

    reconciler.run_cycle();
    let snapshot = reconciler.current();

    assert_eq!(handle_of(&snapshot, 1), WindowHandle(7));
    assert_eq!(handle_of(&snapshot, 0), WindowHandle::NONE);
}

#[test]
fn pinned_slot_reacquires_reopened_program() {
    let source = desktop(&["x.exe", "other.exe"], vec![window(10, "Main", 1), window(11, "Side", 2)]);
    let mut reconciler = reconciler(&source, vec![pinned(0, "x.exe"), Slot::any_window(1)]);

    reconciler.run_cycle();
    assert_eq!(handle_of(&reconciler.current(), 0), WindowHandle(10));

    source.set_windows(vec![window(11, "Side", 2)]);
    reconciler.run_cycle();
    let closed = reconciler.current();
    assert_eq!(handle_of(&closed, 0), WindowHandle::IDLE);
    assert_eq!(pinned_exe(&closed, 0), "x.exe");
    let TaskProperties::ShowProgramWindow(props) = &closed.get(0).unwrap().task else {
        panic!("expected a program slot");
    };
    assert!(props.window_title.is_empty());
    assert_eq!(props.app_name, "X");

    source.set_windows(vec![window(11, "Side", 2), window(12, "Main", 1)]);
    reconciler.run_cycle();
    let reopened = reconciler.current();
    assert_eq!(handle_of(&reopened, 0), WindowHandle(12));
    assert_eq!(pinned_exe(&reopened, 0), "x.exe");
    assert_eq!(handle_of(&reopened, 1), WindowHandle(11));
}

#[test]
fn hidden_window_returns_without_displacing_its_replacement() {
    let source = desktop(&["a.exe", "b.exe"], vec![window(1, "Player", 1)]);
    let mut reconciler = reconciler(&source, vec![Slot::any_window(0), Slot::any_window(1)]);

    reconciler.run_cycle();
    assert_eq!(handle_of(&reconciler.current(), 0), WindowHandle(1));

    source.set_windows(vec![window(2, "Editor", 2)]);
    reconciler.run_cycle();
    let refilled = reconciler.current();
    assert_eq!(handle_of(&refilled, 0), WindowHandle(2));
    assert_eq!(handle_of(&refilled, 1), WindowHandle::NONE);

    source.set_windows(vec![window(1, "Player", 1), window(2, "Editor", 2)]);
    reconciler.run_cycle();
    let returned = reconciler.current();
    assert_eq!(handle_of(&returned, 0), WindowHandle(2));
    assert_eq!(handle_of(&returned, 1), WindowHandle(1));
}

#[test]
fn identical_windows_get_dense_instance_numbers() {
    let source = desktop(&["notepad.exe"], vec![window(1, "Notes", 1), window(2, "Notes", 1), window(3, "Notes", 1)]);
    let mut reconciler = reconciler(&source, Vec::new());

    reconciler.run_cycle();
    let numbers: BTreeSet<u32> = reconciler.live_windows().values().map(|info| info.instance_number).collect();
    assert_eq!(numbers, BTreeSet::from([0, 1, 2]));

    source.set_windows(vec![window(1, "Notes", 1), window(3, "Notes", 1)]);
    reconciler.run_cycle();
    let numbers: BTreeSet<u32> = reconciler.live_windows().values().map(|info| info.instance_number).collect();
    assert_eq!(numbers, BTreeSet::from([0, 1]));
    assert_eq!(reconciler.live_windows()[&WindowHandle(1)].instance_number, 0);

    source.set_windows(vec![window(1, "Notes", 1), window(3, "Notes", 1), window(4, "Notes", 1)]);
    reconciler.run_cycle();
    assert_eq!(reconciler.live_windows()[&WindowHandle(4)].instance_number, 2);
}

#[test]
fn unchanged_desktop_is_idempotent() {
    let source = desktop(&["a.exe", "b.exe"], vec![window(1, "One", 1), window(2, "Two", 2), window(3, "Three", 2)]);
    let mut reconciler = reconciler(&source, vec![pinned(0, "b.exe"), Slot::any_window(1), Slot::any_window(2)]);

    reconciler.run_cycle();
    let first = reconciler.current();

    reconciler.request_full_pass();
    assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
    assert_eq!(*reconciler.current(), *first);

    assert_eq!(reconciler.run_cycle(), CycleOutcome::Unchanged);
    assert_eq!(*reconciler.current(), *first);
}

#[test]
fn no_window_is_ever_shown_twice() {
    let exes = ["a.exe", "b.exe", "c.exe"];
    let source = desktop(&exes, Vec::new());
    let mut reconciler = reconciler(&source, vec![
        Slot::any_window(0),
        pinned(1, "a.exe"),
        Slot::any_window(2),
        pinned(3, "c.exe"),
        pinned(4, "a.exe"),
        Slot::any_window(5),
    ]);

    for step in 0..24_i64 {
        let windows = (1..=9_i64)
            .filter(|h| (h * 7 + step) % 3 != 0)
            .map(|h| {
                let pid = u32::try_from(h % 3).unwrap() + 1;
                window(h + (step / 6) * 100, &format!("Window {h}"), pid)
            })
            .collect();
        source.set_windows(windows);

        let outcome = reconciler.run_cycle();
        assert!(
            !matches!(outcome, CycleOutcome::Rejected(_) | CycleOutcome::Panicked(_)),
            "step {step}: {outcome}"
        );

        let snapshot = reconciler.current();
        let mut seen = HashSet::new();
        for slot in snapshot.iter() {
            if let Some(handle) = slot.assigned_window() {
                assert!(seen.insert(handle), "step {step}: {handle} shown twice");
                assert!(reconciler.live_windows().contains_key(&handle));
            }
        }
        assert_eq!(pinned_exe(&snapshot, 1), "a.exe");
        assert_eq!(pinned_exe(&snapshot, 3), "c.exe");
        assert_eq!(pinned_exe(&snapshot, 4), "a.exe");
    }
}

#[test]
fn side_table_purges_only_closed_windows_past_threshold() {
    let source = desktop(&["a.exe"], vec![window(1, "1", 1), window(2, "2", 1), window(3, "3", 1)]);
    let slots = vec![Slot::any_window(0), Slot::any_window(1), Slot::any_window(2)];
    let mut reconciler = reconciler_with(&source, slots, ReconciliationEngine::new(4));

    reconciler.run_cycle();
    assert_eq!(reconciler.engine().claims_len(), 3);

    source.set_windows(vec![window(4, "4", 1), window(5, "5", 1), window(6, "6", 1)]);
    reconciler.run_cycle();

    let engine = reconciler.engine();
    assert_eq!(engine.claims_len(), 3);
    for closed in 1..=3 {
        assert_eq!(engine.claim_of(WindowHandle(closed)), None);
    }
    for open in 4..=6 {
        assert!(engine.claim_of(WindowHandle(open)).is_some());
    }
}

#[test]
fn side_table_keeps_closed_windows_below_threshold() {
    let source = desktop(&["a.exe"], vec![window(1, "1", 1), window(2, "2", 1)]);
    let mut reconciler = reconciler(&source, vec![Slot::any_window(0), Slot::any_window(1)]);

    reconciler.run_cycle();
    source.set_windows(vec![window(3, "3", 1)]);
    reconciler.run_cycle();

    assert_eq!(reconciler.engine().claims_len(), 3);
    assert_eq!(handle_of(&reconciler.current(), 0), WindowHandle(3));
    assert_eq!(handle_of(&reconciler.current(), 1), WindowHandle::NONE);
}

#[test]
fn configured_slots_drive_the_pipeline() {
    let config = parse_config(
        r#"{
            "slots": [
                { "taskType": "showProgramWindow", "properties": { "exeName": "Code.exe" } },
                { "taskType": "launchProgram", "properties": { "exePath": "C:\\Tools\\term.exe" } },
                { "taskType": "callFunction", "properties": { "functionName": "lockScreen" } },
                { "taskType": "mystery" },
                { "taskType": "showAnyWindow" }
            ]
        }"#,
    )
    .unwrap();

    let source = desktop(&["code.exe", "mail.exe"], vec![window(5, "main.rs", 1), window(6, "Inbox", 2)]);
    let slots = config.slot_registry().get_slots().to_vec();
    let mut reconciler = reconciler(&source, slots);

    assert_eq!(reconciler.run_cycle(), CycleOutcome::Published { slots: 5 });
    let snapshot = reconciler.current();

    assert_eq!(handle_of(&snapshot, 0), WindowHandle(5));
    let TaskProperties::LaunchProgram(launch) = &snapshot.get(1).unwrap().task else {
        panic!("expected a launch slot");
    };
    assert_eq!(launch.exe_name, "term.exe");
    assert_eq!(launch.app_name, "Term");
    assert_eq!(snapshot.get(2).unwrap().task, config.slot_registry().get_slots()[2].task);
    assert_eq!(handle_of(&snapshot, 3), WindowHandle(6));
    assert_eq!(handle_of(&snapshot, 4), WindowHandle::NONE);
}
