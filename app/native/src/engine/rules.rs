//! Window filtering and title normalization rules.
//!
//! A window is shown in the pie menu only if it is something the user would
//! recognise as an application window. Shell surfaces, accessibility helpers
//! and the application's own overlays are filtered out here.
//!
//! # Title normalization
//!
//! Titles are trimmed of the owning application's name so slots show
//! `"report.docx"` rather than `"report.docx - Word"`:
//!
//! ```text
//! ("Downloads - File Explorer", "explorer.exe", _)      -> "Downloads"
//! ("notes.txt - Notepad",       "notepad.exe", "Notepad") -> "notes.txt"
//! ("Notepad",                   "notepad.exe", "Notepad") -> "Notepad"
//! ```

use std::collections::HashSet;
use std::path::Path;

use crate::constants::{SHELL_FILE_MANAGER_EXE, SHELL_FILE_MANAGER_SUFFIXES, UNKNOWN_APP};
use crate::engine::types::WindowHandle;
use crate::platform::RawWindow;

// ============================================================================
// Window Filtering
// ============================================================================

/// Window classes that are never shown.
///
/// These are shell desktop surfaces and accessibility helpers that report as
/// visible top-level windows but are not applications.
pub const EXCLUDED_WINDOW_CLASSES: &[&str] = &[
    // Shell desktop and taskbar
    "Progman",
    "WorkerW",
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "SHELLDLL_DefView",
    "NotifyIconOverflowWindow",
    "Windows.UI.Input.InputSite.WindowClass",
    // Accessibility and input helpers
    "MagUIClass",
    "NarratorHelperWindow",
    "IME",
    "MSCTFIME UI",
];

/// Static inputs to [`should_include_window`] that come from configuration.
#[derive(Debug, Clone)]
pub struct CaptureFilter {
    /// Extra window classes to exclude on top of [`EXCLUDED_WINDOW_CLASSES`].
    pub extra_excluded_classes: Vec<String>,
    /// Display name of the host application.
    pub host_display_name: String,
}

impl CaptureFilter {
    /// Creates a filter for the given host display name.
    #[must_use]
    pub fn new(host_display_name: impl Into<String>) -> Self {
        Self {
            extra_excluded_classes: Vec::new(),
            host_display_name: host_display_name.into(),
        }
    }

    /// Adds extra excluded window classes.
    #[must_use]
    pub fn with_excluded_classes(mut self, classes: Vec<String>) -> Self {
        self.extra_excluded_classes = classes;
        self
    }

    /// Returns `true` if the window class is excluded.
    #[must_use]
    pub fn is_excluded_class(&self, class_name: &str) -> bool {
        EXCLUDED_WINDOW_CLASSES.iter().any(|&class| class == class_name)
            || self.extra_excluded_classes.iter().any(|class| class == class_name)
    }
}

/// Decides whether a raw window belongs in the live window set.
///
/// All of the following must hold:
/// - visible and not cloaked by the compositor
/// - non-empty title after trimming
/// - class not excluded
/// - handle not one of our own windows nor caller-excluded
/// - title does not contain the host application's display name
#[must_use]
pub fn should_include_window(
    window: &RawWindow,
    filter: &CaptureFilter,
    excluded_handles: &HashSet<WindowHandle>,
    self_handles: &HashSet<WindowHandle>,
) -> bool {
    if !window.visible || window.cloaked {
        return false;
    }

    if window.title.trim().is_empty() {
        return false;
    }

    if filter.is_excluded_class(&window.class_name) {
        return false;
    }

    if self_handles.contains(&window.handle) || excluded_handles.contains(&window.handle) {
        return false;
    }

    let host = filter.host_display_name.as_str();
    !(!host.is_empty() && window.title.contains(host))
}

// ============================================================================
// Executable names
// ============================================================================

/// Derives the lower-cased executable file name from a path.
///
/// Accepts both `/` and `\` separators so Windows paths resolve the same on
/// every host. Returns [`UNKNOWN_APP`] when no path is available.
#[must_use]
pub fn exe_name_from_path(path: Option<&Path>) -> String {
    path.and_then(|p| p.to_str())
        .and_then(|p| p.rsplit(['\\', '/']).next())
        .filter(|name| !name.is_empty())
        .map_or_else(|| UNKNOWN_APP.to_string(), str::to_lowercase)
}

/// Derives a display name from an executable name: `"notepad.exe"` -> `"Notepad"`.
#[must_use]
pub fn display_name_from_exe(exe_name: &str) -> String {
    if exe_name == UNKNOWN_APP {
        return UNKNOWN_APP.to_string();
    }

    let stem = exe_name
        .rsplit_once('.')
        .map_or(exe_name, |(stem, _)| if stem.is_empty() { exe_name } else { stem });

    let mut chars = stem.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

// ============================================================================
// Title Normalization
// ============================================================================

/// Normalizes a raw window title.
///
/// Deterministic in `(title, exe_name, app_name)`:
/// 1. trim surrounding whitespace
/// 2. for the shell's file manager, strip its well-known suffix
/// 3. strip a trailing `" - <app_name>"` if something precedes it
#[must_use]
pub fn normalize_title(title: &str, exe_name: &str, app_name: Option<&str>) -> String {
    let mut normalized = title.trim();

    if exe_name.eq_ignore_ascii_case(SHELL_FILE_MANAGER_EXE) {
        for suffix in SHELL_FILE_MANAGER_SUFFIXES {
            normalized = strip_title_suffix(normalized, suffix);
        }
    }

    if let Some(app_name) = app_name.map(str::trim).filter(|name| !name.is_empty()) {
        let suffix = format!(" - {app_name}");
        normalized = strip_title_suffix(normalized, &suffix);
    }

    normalized.to_string()
}

/// Strips `suffix` from `title` unless nothing would be left.
fn strip_title_suffix<'a>(title: &'a str, suffix: &str) -> &'a str {
    match title.strip_suffix(suffix) {
        Some(rest) if !rest.trim().is_empty() => rest.trim_end(),
        _ => title,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn make_window(handle: i64, title: &str, class_name: &str) -> RawWindow {
        RawWindow {
            handle: WindowHandle(handle),
            visible: true,
            cloaked: false,
            title: title.to_string(),
            class_name: class_name.to_string(),
            owner_pid: 100,
        }
    }

    fn include(window: &RawWindow) -> bool {
        should_include_window(window, &CaptureFilter::new("Pieslot"), &HashSet::new(), &HashSet::new())
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    #[test]
    fn test_includes_regular_window() {
        assert!(include(&make_window(1, "notes.txt - Notepad", "Notepad")));
    }

    #[test]
    fn test_excludes_invisible_and_cloaked() {
        let mut window = make_window(1, "Mail", "ApplicationFrameWindow");
        window.visible = false;
        assert!(!include(&window));

        let mut window = make_window(1, "Mail", "ApplicationFrameWindow");
        window.cloaked = true;
        assert!(!include(&window));
    }

    #[test]
    fn test_excludes_blank_titles() {
        assert!(!include(&make_window(1, "", "Chrome_WidgetWin_1")));
        assert!(!include(&make_window(1, "   ", "Chrome_WidgetWin_1")));
    }

    #[test]
    fn test_excludes_shell_classes() {
        assert!(!include(&make_window(1, "Program Manager", "Progman")));
        assert!(!include(&make_window(1, "Taskbar", "Shell_TrayWnd")));
    }

    #[test]
    fn test_excludes_extra_classes_from_config() {
        let filter = CaptureFilter::new("Pieslot").with_excluded_classes(vec!["MyOverlay".into()]);
        let window = make_window(1, "Overlay", "MyOverlay");
        assert!(!should_include_window(&window, &filter, &HashSet::new(), &HashSet::new()));
    }

    #[test]
    fn test_excludes_self_and_caller_handles() {
        let window = make_window(5, "Editor", "Editor");
        let filter = CaptureFilter::new("Pieslot");
        let handles: HashSet<WindowHandle> = [WindowHandle(5)].into_iter().collect();

        assert!(!should_include_window(&window, &filter, &handles, &HashSet::new()));
        assert!(!should_include_window(&window, &filter, &HashSet::new(), &handles));
    }

    #[test]
    fn test_excludes_titles_containing_host_name() {
        assert!(!include(&make_window(1, "Pieslot Settings", "Window")));
    }

    // ========================================================================
    // Executable names
    // ========================================================================

    #[test]
    fn test_exe_name_from_windows_path() {
        let path = PathBuf::from(r"C:\Program Files\Notepad++\Notepad++.EXE");
        assert_eq!(exe_name_from_path(Some(&path)), "notepad++.exe");
    }

    #[test]
    fn test_exe_name_from_unix_path() {
        let path = PathBuf::from("/usr/bin/Code");
        assert_eq!(exe_name_from_path(Some(&path)), "code");
    }

    #[test]
    fn test_exe_name_unknown() {
        assert_eq!(exe_name_from_path(None), UNKNOWN_APP);
    }

    #[test]
    fn test_display_name_from_exe() {
        assert_eq!(display_name_from_exe("notepad.exe"), "Notepad");
        assert_eq!(display_name_from_exe("code"), "Code");
        assert_eq!(display_name_from_exe(".hidden"), ".hidden");
        assert_eq!(display_name_from_exe(UNKNOWN_APP), UNKNOWN_APP);
        assert_eq!(display_name_from_exe(""), "");
    }

    // ========================================================================
    // Title normalization
    // ========================================================================

    #[test]
    fn test_normalize_strips_file_explorer_suffix() {
        assert_eq!(normalize_title("Downloads - File Explorer", "explorer.exe", None), "Downloads");
    }

    #[test]
    fn test_normalize_keeps_explorer_suffix_for_other_exes() {
        assert_eq!(
            normalize_title("Downloads - File Explorer", "totalcmd.exe", None),
            "Downloads - File Explorer"
        );
    }

    #[test]
    fn test_normalize_strips_app_name_suffix() {
        assert_eq!(
            normalize_title("notes.txt - Notepad", "notepad.exe", Some("Notepad")),
            "notes.txt"
        );
    }

    #[test]
    fn test_normalize_keeps_bare_app_name() {
        assert_eq!(normalize_title("Notepad", "notepad.exe", Some("Notepad")), "Notepad");
        assert_eq!(normalize_title(" - Notepad", "notepad.exe", Some("Notepad")), "- Notepad");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let first = normalize_title("  a - b - Word ", "winword.exe", Some("Word"));
        let second = normalize_title("  a - b - Word ", "winword.exe", Some("Word"));
        assert_eq!(first, "a - b");
        assert_eq!(first, second);
    }
}
