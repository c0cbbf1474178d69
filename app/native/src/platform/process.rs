//! Owning-process executable resolution backed by `sysinfo`.

use std::path::PathBuf;

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use super::ProcessResolver;

/// Resolves process ids to executable paths by querying the OS process table.
///
/// Only the requested pid is refreshed on each lookup.
pub struct SysinfoProcessResolver {
    system: Mutex<System>,
}

impl SysinfoProcessResolver {
    /// Creates a resolver with an empty process table.
    #[must_use]
    pub fn new() -> Self { Self { system: Mutex::new(System::new()) } }
}

impl Default for SysinfoProcessResolver {
    fn default() -> Self { Self::new() }
}

impl ProcessResolver for SysinfoProcessResolver {
    fn executable_path(&self, pid: u32) -> Option<PathBuf> {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock();

        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );

        system.process(pid).and_then(|process| process.exe()).map(std::path::Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_current_process() {
        let resolver = SysinfoProcessResolver::new();
        let path = resolver.executable_path(std::process::id());
        // Some sandboxes hide /proc/self/exe; only check the shape when present.
        if let Some(path) = path {
            assert!(path.file_name().is_some());
        }
    }

    #[test]
    fn test_unknown_pid_resolves_to_none() {
        let resolver = SysinfoProcessResolver::new();
        assert_eq!(resolver.executable_path(u32::MAX - 1), None);
    }
}
