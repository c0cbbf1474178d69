//! Application-wide constants.

/// Application identifier used for config and cache directories.
pub const APP_ID: &str = "pieslot";

/// Display name of the host application.
///
/// Windows whose title contains this string are treated as our own overlays.
pub const APP_DISPLAY_NAME: &str = "Pieslot";

/// Executable name reported when a window's owning process cannot be resolved.
pub const UNKNOWN_APP: &str = "Unknown App";

/// Executable name of the Windows shell's file manager.
pub const SHELL_FILE_MANAGER_EXE: &str = "explorer.exe";

/// Title suffixes appended by the shell's file manager.
pub const SHELL_FILE_MANAGER_SUFFIXES: &[&str] = &[" - File Explorer", " - Explorer"];
