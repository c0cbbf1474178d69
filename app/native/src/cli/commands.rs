//! CLI command definitions using Clap.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use colored::Colorize;
use serde::Serialize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::output;
use crate::actions::{CommandLauncher, FunctionRegistry, SlotAction, WindowCommand, perform, resolve_action};
use crate::config::{self, LoadedConfig};
use crate::engine::types::{LiveWindowSet, Slot, SlotAssignmentSnapshot, TaskProperties, WindowHandle};
use crate::engine::{AppInfoCache, ExeStemResolver, LookupQueue, ReconciliationEngine, WindowSnapshotProvider};
use crate::error::PieslotError;
use crate::service::{CycleOutcome, ReconcileService, Reconciler};
use crate::{platform, schema};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Widest title shown in tables.
const TITLE_WIDTH: usize = 48;

/// Pieslot - keeps pie menu slots in sync with open windows.
#[derive(Parser, Debug)]
#[command(name = "pieslot")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Read windows from a JSON fixture instead of the desktop.
    ///
    /// The file holds `{ "windows": [...], "processes": { "<pid>": "<exe path>" } }`.
    #[arg(long, short, global = true, value_name = "PATH")]
    pub fixture: Option<String>,

    /// Log engine decisions at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep slots in sync and print every published snapshot.
    ///
    /// Runs until interrupted. Configuration changes are picked up without a
    /// restart.
    Watch {
        /// Print one JSON document per snapshot.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile once and print the slot assignments.
    Snapshot {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the windows slots can show, with their instance numbers.
    Windows {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile once and activate a slot.
    Activate {
        /// Slot index.
        index: usize,

        /// What to do with the slot's window.
        #[arg(long, value_enum, default_value_t = WindowCommand::Focus)]
        op: WindowCommand,

        /// Print the action without performing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(pieslot completions --shell zsh)"
    ///   pieslot completions --shell fish > ~/.config/fish/completions/pieslot.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Returns the fixture path if specified via --fixture flag.
    #[must_use]
    pub fn fixture_path(&self) -> Option<PathBuf> { self.fixture.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), PieslotError> {
        if let Some(path) = self.config_path()
            && !path.exists()
        {
            return Err(PieslotError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        match &self.command {
            Commands::Watch { json } => self.watch(*json),
            Commands::Snapshot { json } => self.snapshot(*json),
            Commands::Windows { json } => self.windows(*json),
            Commands::Activate { index, op, dry_run } => self.activate(*index, *op, *dry_run),
            Commands::Schema => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "pieslot", &mut io::stdout());
    }

    /// Loads configuration and assembles the pipeline.
    fn pipeline(&self) -> Result<(LoadedConfig, Reconciler), PieslotError> {
        let loaded = config::load_or_default(self.config_path().as_deref());
        let (source, resolver) = platform::create_window_source(self.fixture_path().as_deref())?;

        let cache = AppInfoCache::new();
        let lookups = LookupQueue::spawn(cache.clone(), Box::new(ExeStemResolver));
        let provider =
            WindowSnapshotProvider::new(source, resolver, loaded.config.capture_filter(), cache, lookups);
        let engine = ReconciliationEngine::new(loaded.config.eviction_threshold);
        let reconciler = Reconciler::new(provider, engine, loaded.config.slot_registry());

        Ok((loaded, reconciler))
    }

    /// Runs one forced cycle and returns the pipeline.
    fn reconcile_once(&self) -> Result<Reconciler, PieslotError> {
        let (_, mut reconciler) = self.pipeline()?;

        match reconciler.run_cycle() {
            CycleOutcome::Rejected(err) => Err(err.into()),
            CycleOutcome::Panicked(msg) => Err(PieslotError::ReconcileError(msg)),
            outcome => {
                tracing::debug!(%outcome, "reconciled");
                Ok(reconciler)
            }
        }
    }

    fn snapshot(&self, json: bool) -> Result<(), PieslotError> {
        let reconciler = self.reconcile_once()?;
        print_snapshot(&reconciler.current(), json)
    }

    fn windows(&self, json: bool) -> Result<(), PieslotError> {
        let reconciler = self.reconcile_once()?;
        let rows = window_rows(reconciler.live_windows());

        if json {
            output::print_highlighted_json(&serde_json::to_value(&rows)?);
            return Ok(());
        }

        if rows.is_empty() {
            println!("{}", "No windows found.".dimmed());
            return Ok(());
        }

        println!("{}", format!("Windows ({})", rows.len()).bold());
        println!("{}", window_table(rows));
        Ok(())
    }

    fn activate(&self, index: usize, op: WindowCommand, dry_run: bool) -> Result<(), PieslotError> {
        let reconciler = self.reconcile_once()?;
        let snapshot = reconciler.current();

        let slot = snapshot.get(index).ok_or_else(|| {
            PieslotError::InvalidArguments(format!(
                "No slot at index {index} ({} slots configured)",
                snapshot.len()
            ))
        })?;

        let action = resolve_action(slot);
        if dry_run {
            println!("slot {index}: {action}");
            return Ok(());
        }

        let control = platform::create_window_control();
        match &action {
            SlotAction::FocusWindow(handle) => op.apply(control.as_ref(), *handle)?,
            _ if op != WindowCommand::Focus => {
                return Err(PieslotError::InvalidArguments(format!(
                    "Slot {index} has no open window ({action})"
                )));
            }
            _ => perform(&action, control.as_ref(), &CommandLauncher, &FunctionRegistry::new())?,
        }

        tracing::info!(slot = index, %action, "slot activated");
        Ok(())
    }

    fn watch(&self, json: bool) -> Result<(), PieslotError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.watch_async(json))
    }

    async fn watch_async(&self, json: bool) -> Result<(), PieslotError> {
        let (loaded, reconciler) = self.pipeline()?;
        let (handle, task) = ReconcileService::spawn(reconciler, loaded.config.refresh_interval());

        if let Some(path) = loaded.path {
            let service = handle.clone();
            config::watch_config_file(path, move |config| {
                if let Err(err) = service.apply_config(&config) {
                    tracing::warn!(error = %err, "failed to apply reloaded configuration");
                }
            });
        }

        let mut snapshots = handle.subscribe();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                changed = snapshots.changed() => match changed {
                    Ok(snapshot) => print_snapshot(&snapshot, json)?,
                    Err(_) => break,
                },
                _ = &mut ctrl_c => {
                    tracing::debug!("interrupted, stopping");
                    handle.shutdown()?;
                    break;
                }
            }
        }

        task.await.map_err(|err| PieslotError::ServiceError(err.to_string()))
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Slot")]
    index: usize,
    #[tabled(rename = "Task")]
    task: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "#")]
    instance: String,
    #[tabled(rename = "App")]
    app: String,
}

impl SlotRow {
    fn from_slot(slot: &Slot) -> Self {
        let (window, title, instance, app) = match &slot.task {
            TaskProperties::ShowAnyWindow(props) => (
                output::format_handle(props.window_handle),
                props.window_title.clone(),
                instance_cell(props.window_handle, props.instance_number),
                props.app_name.clone(),
            ),
            TaskProperties::ShowProgramWindow(props) => (
                output::format_handle(props.window_handle),
                props.window_title.clone(),
                instance_cell(props.window_handle, props.instance_number),
                format!("{} ({})", props.app_name, props.exe_name),
            ),
            TaskProperties::LaunchProgram(props) => (
                String::new(),
                String::new(),
                String::new(),
                format!("{} ({})", props.app_name, props.exe_name),
            ),
            TaskProperties::CallFunction(props) => {
                (String::new(), props.function_name.clone(), String::new(), String::new())
            }
        };

        Self {
            index: slot.index,
            task: slot.task_type().to_string(),
            window,
            title: output::truncate(&title, TITLE_WIDTH),
            instance,
            app,
        }
    }
}

fn instance_cell(handle: WindowHandle, instance: u32) -> String {
    if handle.is_window() { instance.to_string() } else { String::new() }
}

fn print_snapshot(snapshot: &Arc<SlotAssignmentSnapshot>, json: bool) -> Result<(), PieslotError> {
    if json {
        let slots: Vec<&Slot> = snapshot.iter().collect();
        println!("{}", serde_json::to_string(&slots)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("{}", "No slots configured.".dimmed());
        return Ok(());
    }

    println!("{}", format!("Slots ({})", snapshot.len()).bold());
    println!("{}", slot_table(snapshot));
    Ok(())
}

fn slot_table(snapshot: &SlotAssignmentSnapshot) -> String {
    let rows: Vec<SlotRow> = snapshot.iter().map(SlotRow::from_slot).collect();
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .with(Modify::new(Columns::one(4)).with(Alignment::right()))
        .to_string()
}

fn window_table(rows: Vec<WindowRow>) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .with(Modify::new(Columns::one(3)).with(Alignment::right()))
        .to_string()
}

#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct WindowRow {
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "App")]
    exe_name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "#")]
    instance_number: u32,
}

fn window_rows(live: &LiveWindowSet) -> Vec<WindowRow> {
    live.iter()
        .map(|(handle, info)| WindowRow {
            handle: handle.to_string(),
            exe_name: info.exe_name.clone(),
            title: output::truncate(&info.title, TITLE_WIDTH),
            instance_number: info.instance_number,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{AnyWindowProperties, ProgramWindowProperties, WindowInfo};

    #[test]
    fn test_cli_parses_schema() {
        let cli = Cli::try_parse_from(["pieslot", "schema"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_completions() {
        let cli = Cli::try_parse_from(["pieslot", "completions", "--shell", "zsh"]).unwrap();
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Zsh),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_cli_parses_snapshot_json() {
        let cli = Cli::try_parse_from(["pieslot", "snapshot", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Snapshot { json: true }));
    }

    #[test]
    fn test_cli_parses_activate() {
        let cli = Cli::try_parse_from(["pieslot", "activate", "3", "--op", "minimize", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Activate { index, op, dry_run } => {
                assert_eq!(index, 3);
                assert_eq!(op, WindowCommand::Minimize);
                assert!(dry_run);
            }
            _ => panic!("Expected Activate command"),
        }
    }

    #[test]
    fn test_cli_activate_defaults_to_focus() {
        let cli = Cli::try_parse_from(["pieslot", "activate", "0"]).unwrap();
        assert!(matches!(cli.command, Commands::Activate { op: WindowCommand::Focus, dry_run: false, .. }));
    }

    #[test]
    fn test_cli_rejects_negative_index() {
        assert!(Cli::try_parse_from(["pieslot", "activate", "-1"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pieslot",
            "windows",
            "--fixture",
            "/tmp/windows.json",
            "--config",
            "/tmp/config.jsonc",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.fixture_path(), Some(PathBuf::from("/tmp/windows.json")));
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/config.jsonc")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_missing_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["pieslot", "schema", "--config", "/nonexistent/pieslot.jsonc"]).unwrap();
        assert!(matches!(cli.execute(), Err(PieslotError::ConfigError(_))));
    }

    #[test]
    fn test_app_version_is_not_empty() {
        assert!(!APP_VERSION.is_empty());
    }

    #[test]
    fn test_slot_row_for_idle_program() {
        let slot = Slot::new(2, TaskProperties::ShowProgramWindow(ProgramWindowProperties {
            window_handle: WindowHandle::IDLE,
            app_name: "Code".to_string(),
            ..ProgramWindowProperties::pinned("code.exe")
        }));

        let row = SlotRow::from_slot(&slot);
        assert_eq!(row.index, 2);
        assert_eq!(row.task, "showProgramWindow");
        assert!(row.window.contains("not running"));
        assert!(row.instance.is_empty());
        assert_eq!(row.app, "Code (code.exe)");
    }

    #[test]
    fn test_slot_row_for_filled_window() {
        let slot = Slot::new(0, TaskProperties::ShowAnyWindow(AnyWindowProperties {
            window_handle: WindowHandle(0x20),
            window_title: "notes.txt".to_string(),
            instance_number: 1,
            ..AnyWindowProperties::default()
        }));

        let row = SlotRow::from_slot(&slot);
        assert_eq!(row.window, "0x20");
        assert_eq!(row.instance, "1");
        assert_eq!(row.title, "notes.txt");
    }

    #[test]
    fn test_window_rows_follow_handle_order() {
        let mut live = LiveWindowSet::new();
        live.insert(WindowHandle(9), WindowInfo {
            title: "b".to_string(),
            exe_name: "b.exe".to_string(),
            instance_number: 0,
        });
        live.insert(WindowHandle(3), WindowInfo {
            title: "a".to_string(),
            exe_name: "a.exe".to_string(),
            instance_number: 0,
        });

        let rows = window_rows(&live);
        assert_eq!(rows[0].handle, "0x3");
        assert_eq!(rows[1].exe_name, "b.exe");

        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["exeName"], "a.exe");
        assert_eq!(json[0]["instanceNumber"], 0);
    }

    #[test]
    fn test_slot_table_renders_every_slot() {
        let snapshot: SlotAssignmentSnapshot = [
            Slot::new(0, TaskProperties::ShowAnyWindow(AnyWindowProperties {
                window_handle: WindowHandle(0x20),
                window_title: "notes.txt".to_string(),
                ..AnyWindowProperties::default()
            })),
            Slot::any_window(1),
        ]
        .into_iter()
        .collect();

        let table = slot_table(&snapshot);

        assert!(table.starts_with('╭'));
        assert!(table.contains("notes.txt"));
        assert!(table.contains("showAnyWindow"));
        assert_eq!(table.lines().count(), 6);
    }

    #[test]
    fn test_window_table_right_aligns_instance_column() {
        let mut live = LiveWindowSet::new();
        live.insert(WindowHandle(3), WindowInfo {
            title: "Untitled".to_string(),
            exe_name: "notepad.exe".to_string(),
            instance_number: 12,
        });
        live.insert(WindowHandle(4), WindowInfo {
            title: "Untitled".to_string(),
            exe_name: "notepad.exe".to_string(),
            instance_number: 3,
        });

        let table = window_table(window_rows(&live));

        assert!(table.contains("notepad.exe"));
        assert!(table.lines().any(|line| line.contains(" 3 │")));
    }
}
