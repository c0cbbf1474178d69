//! Configuration types and loading for Pieslot.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{APP_DISPLAY_NAME, APP_ID};
use crate::engine::reconcile::DEFAULT_EVICTION_THRESHOLD;
use crate::engine::rules::{CaptureFilter, exe_name_from_path};
use crate::engine::types::{
    AnyWindowProperties, CallFunctionProperties, LaunchProgramProperties, ProgramWindowProperties,
    Slot, SlotRegistry, TaskProperties, TaskType,
};

/// Default cycle interval in milliseconds.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;

/// Root configuration.
///
/// Every key is optional; a missing file behaves like `{}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PieslotConfig {
    /// Interval between reconciliation cycles, in milliseconds.
    /// Default: 2000. Values below 50 are raised to 50.
    pub refresh_interval_ms: u64,

    /// Number of remembered window claims above which claims for closed
    /// windows are purged. Default: 64.
    pub eviction_threshold: usize,

    /// Window classes to hide, on top of the built-in list of shell and
    /// accessibility surfaces.
    pub excluded_classes: Vec<String>,

    /// Windows whose title contains this text are treated as Pieslot's own
    /// and never shown. Default: "Pieslot"
    pub host_display_name: String,

    /// Pie menu slots in menu order.
    pub slots: Vec<SlotConfig>,
}

impl Default for PieslotConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            eviction_threshold: DEFAULT_EVICTION_THRESHOLD,
            excluded_classes: Vec::new(),
            host_display_name: APP_DISPLAY_NAME.to_string(),
            slots: Vec::new(),
        }
    }
}

impl PieslotConfig {
    /// Returns the capture filter described by this configuration.
    #[must_use]
    pub fn capture_filter(&self) -> CaptureFilter {
        CaptureFilter::new(&*self.host_display_name).with_excluded_classes(self.excluded_classes.clone())
    }

    /// Returns the cycle interval.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration { Duration::from_millis(self.refresh_interval_ms) }

    /// Builds the slot registry.
    ///
    /// A slot that fails validation is replaced by an empty "any window" slot
    /// so the remaining slots keep their positions.
    #[must_use]
    pub fn slot_registry(&self) -> SlotRegistry {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.to_slot(index).unwrap_or_else(|err| {
                    tracing::warn!(slot = index, error = %err, "invalid slot definition, using an empty slot");
                    Slot::any_window(index)
                })
            })
            .collect();

        SlotRegistry::new(slots)
    }
}

/// One slot as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotConfig {
    /// What the slot does.
    /// - `showAnyWindow`: shows whichever open window is left over.
    /// - `showProgramWindow`: shows a window of the program named by `exeName`.
    /// - `launchProgram`: starts the program at `exePath`.
    /// - `callFunction`: runs the built-in function named by `functionName`.
    pub task_type: String,

    /// Task-specific settings, e.g. `{ "exeName": "code.exe" }`.
    #[serde(default)]
    pub properties: Value,
}

/// Reasons a configured slot is rejected.
#[derive(Debug, Error)]
pub enum SlotConfigError {
    #[error("unknown task type {0:?}")]
    UnknownTaskType(String),

    #[error("invalid properties for {task_type}: {source}")]
    InvalidProperties {
        task_type: TaskType,
        #[source]
        source: serde_json::Error,
    },

    #[error("{task_type} slot is missing {property:?}")]
    MissingProperty { task_type: TaskType, property: &'static str },
}

impl SlotConfig {
    /// Creates a slot definition.
    #[must_use]
    pub fn new(task_type: impl Into<String>, properties: Value) -> Self {
        Self { task_type: task_type.into(), properties }
    }

    /// Validates this definition into a typed slot at `index`.
    ///
    /// Executable names are lower-cased. Program slots may give only
    /// `exePath`; the name is then taken from the path.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown task type, properties of the wrong
    /// shape, or a missing required property.
    pub fn to_slot(&self, index: usize) -> Result<Slot, SlotConfigError> {
        let task_type = TaskType::parse(&self.task_type)
            .ok_or_else(|| SlotConfigError::UnknownTaskType(self.task_type.clone()))?;

        let mut properties = match &self.properties {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(SlotConfigError::InvalidProperties {
                    task_type,
                    source: serde::de::Error::custom(format!("expected an object, found {other}")),
                });
            }
        };

        let invalid = |source: serde_json::Error| SlotConfigError::InvalidProperties { task_type, source };

        let task = match task_type {
            TaskType::ShowAnyWindow => {
                let props: AnyWindowProperties =
                    serde_json::from_value(Value::Object(properties)).map_err(invalid)?;
                TaskProperties::ShowAnyWindow(props)
            }
            TaskType::ShowProgramWindow => {
                fill_exe_name(&mut properties);
                let mut props: ProgramWindowProperties =
                    serde_json::from_value(Value::Object(properties)).map_err(invalid)?;
                props.exe_name = required_exe_name(task_type, &props.exe_name)?;
                TaskProperties::ShowProgramWindow(props)
            }
            TaskType::LaunchProgram => {
                fill_exe_name(&mut properties);
                let mut props: LaunchProgramProperties =
                    serde_json::from_value(Value::Object(properties)).map_err(invalid)?;
                props.exe_name = required_exe_name(task_type, &props.exe_name)?;
                TaskProperties::LaunchProgram(props)
            }
            TaskType::CallFunction => {
                let props: CallFunctionProperties =
                    serde_json::from_value(Value::Object(properties)).map_err(invalid)?;
                if props.function_name.trim().is_empty() {
                    return Err(SlotConfigError::MissingProperty { task_type, property: "functionName" });
                }
                TaskProperties::CallFunction(props)
            }
        };

        Ok(Slot::new(index, task))
    }
}

/// Sets `exeName` from `exePath` when only the path is given.
fn fill_exe_name(properties: &mut Map<String, Value>) {
    let has_name = properties
        .get("exeName")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if has_name {
        return;
    }

    if let Some(path) = properties.get("exePath").and_then(Value::as_str).filter(|p| !p.is_empty()) {
        let name = exe_name_from_path(Some(Path::new(path)));
        properties.insert("exeName".to_string(), Value::String(name));
    }
}

fn required_exe_name(task_type: TaskType, exe_name: &str) -> Result<String, SlotConfigError> {
    let exe_name = exe_name.trim();
    if exe_name.is_empty() {
        return Err(SlotConfigError::MissingProperty { task_type, property: "exeName" });
    }
    Ok(exe_name.to_lowercase())
}

// ============================================================================
// Loading
// ============================================================================

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error("no configuration file found (expected ~/.config/{APP_ID}/config.jsonc or config.json)")]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/pieslot/`, if set
/// 2. `~/.config/pieslot/`
/// 3. the platform config directory (`%APPDATA%\pieslot\` on Windows)
///
/// Each location is checked for `config.jsonc` then `config.json`.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut dirs_to_search = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        dirs_to_search.push(PathBuf::from(xdg_config).join(APP_ID));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_to_search.push(home.join(".config").join(APP_ID));
    }
    if let Some(config_dir) = dirs::config_dir() {
        dirs_to_search.push(config_dir.join(APP_ID));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for dir in dirs_to_search {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME and the platform dir are often ~/.config
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    paths
}

/// Returns the first configuration file that exists.
#[must_use]
pub fn find_config_path() -> Option<PathBuf> { config_paths().into_iter().find(|path| path.is_file()) }

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists, or any
/// error from [`load_config_from_path`].
pub fn load_config() -> Result<(PieslotConfig, PathBuf), ConfigError> {
    let path = find_config_path().ok_or(ConfigError::NotFound)?;
    load_config_from_path(&path)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::Io` if it cannot be read and `ConfigError::Parse` if it is
/// not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(PieslotConfig, PathBuf), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: PieslotConfig = serde_json::from_reader(reader)?;

    Ok((config, path.to_path_buf()))
}

/// Parses configuration text. Comments are allowed.
///
/// # Errors
///
/// Returns `ConfigError::Parse` if the text is not valid JSONC.
pub fn parse_config(text: &str) -> Result<PieslotConfig, ConfigError> {
    let reader = json_comments::StripComments::new(text.as_bytes());
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::types::WindowHandle;

    #[test]
    fn test_default_config() {
        let config = PieslotConfig::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
        assert_eq!(config.eviction_threshold, DEFAULT_EVICTION_THRESHOLD);
        assert_eq!(config.host_display_name, "Pieslot");
        assert!(config.slot_registry().is_empty());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config, PieslotConfig::default());
    }

    #[test]
    fn test_parse_config_with_comments() {
        let config = parse_config(
            r#"{
                // poll faster
                "refreshIntervalMs": 500,
                /* hide the tool palette */
                "excludedClasses": ["ToolPalette"],
                "slots": [
                    { "taskType": "showProgramWindow", "properties": { "exeName": "Code.exe" } },
                    { "taskType": "showAnyWindow" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.refresh_interval(), Duration::from_millis(500));
        assert!(config.capture_filter().is_excluded_class("ToolPalette"));
        assert!(config.capture_filter().is_excluded_class("Progman"));

        let registry = config.slot_registry();
        assert_eq!(registry.len(), 2);
        let TaskProperties::ShowProgramWindow(props) = &registry.get_slots()[0].task else {
            panic!("expected a program window slot");
        };
        assert_eq!(props.exe_name, "code.exe");
        assert_eq!(props.window_handle, WindowHandle::NONE);
        assert_eq!(registry.get_slots()[1].task_type(), TaskType::ShowAnyWindow);
    }

    #[test]
    fn test_parse_config_rejects_invalid_json() {
        assert!(matches!(parse_config("{ not json"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_program_slot_derives_exe_name_from_path() {
        let slot = SlotConfig::new(
            "launchProgram",
            json!({ "exePath": "C:\\Program Files\\Mozilla Firefox\\Firefox.exe" }),
        )
        .to_slot(3)
        .unwrap();

        assert_eq!(slot.index, 3);
        let TaskProperties::LaunchProgram(props) = slot.task else {
            panic!("expected a launch slot");
        };
        assert_eq!(props.exe_name, "firefox.exe");
        assert!(props.exe_path.is_some());
    }

    #[test]
    fn test_program_slot_requires_exe_name() {
        let err = SlotConfig::new("showProgramWindow", json!({})).to_slot(0).unwrap_err();
        assert!(matches!(err, SlotConfigError::InvalidProperties { .. }));

        let err = SlotConfig::new("launchProgram", json!({ "exeName": "  " })).to_slot(0).unwrap_err();
        assert!(matches!(err, SlotConfigError::MissingProperty { property: "exeName", .. }));
    }

    #[test]
    fn test_call_function_slot() {
        let slot = SlotConfig::new("call_function", json!({ "functionName": "lockScreen" }))
            .to_slot(1)
            .unwrap();
        assert_eq!(
            slot.task,
            TaskProperties::CallFunction(CallFunctionProperties { function_name: "lockScreen".to_string() })
        );

        let err = SlotConfig::new("callFunction", json!({ "functionName": "" })).to_slot(1).unwrap_err();
        assert!(matches!(err, SlotConfigError::MissingProperty { property: "functionName", .. }));
    }

    #[test]
    fn test_unknown_task_type() {
        let err = SlotConfig::new("openPortal", Value::Null).to_slot(0).unwrap_err();
        assert!(matches!(err, SlotConfigError::UnknownTaskType(name) if name == "openPortal"));
    }

    #[test]
    fn test_non_object_properties_are_invalid() {
        let err = SlotConfig::new("showAnyWindow", json!([1, 2])).to_slot(0).unwrap_err();
        assert!(matches!(err, SlotConfigError::InvalidProperties { .. }));
    }

    #[test]
    fn test_invalid_slots_degrade_to_any_window() {
        let config = PieslotConfig {
            slots: vec![
                SlotConfig::new("launchProgram", json!({ "exeName": "notepad.exe" })),
                SlotConfig::new("bogus", Value::Null),
                SlotConfig::new("showProgramWindow", json!({ "windowHandle": "nope", "exeName": "a.exe" })),
            ],
            ..PieslotConfig::default()
        };

        let registry = config.slot_registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_slots()[0].task_type(), TaskType::LaunchProgram);
        assert_eq!(registry.get_slots()[1], Slot::any_window(1));
        assert_eq!(registry.get_slots()[2], Slot::any_window(2));
    }

    #[test]
    fn test_any_window_slot_keeps_seeded_handle() {
        let slot = SlotConfig::new("showAnyWindow", json!({ "windowHandle": 4242, "windowTitle": "Inbox" }))
            .to_slot(0)
            .unwrap();
        assert_eq!(slot.task.window_handle(), Some(WindowHandle(4242)));
    }

    #[test]
    fn test_config_paths_use_known_file_names() {
        for path in config_paths() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap();
            assert!(CONFIG_FILE_NAMES.contains(&name));
            assert!(path.parent().unwrap().ends_with(APP_ID));
        }
    }

    #[test]
    fn test_load_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(&path, r#"{ "evictionThreshold": 8, // small
            "hostDisplayName": "Pie" }"#)
        .unwrap();

        let (config, loaded_from) = load_config_from_path(&path).unwrap();
        assert_eq!(loaded_from, path);
        assert_eq!(config.eviction_threshold, 8);
        assert_eq!(config.capture_filter().host_display_name, "Pie");
    }

    #[test]
    fn test_load_config_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_from_path(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }
}
