//! Detection by filesystem lookups.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::SystemProbe;
use crate::catalog::TaskDescriptor;

/// Extensions tried when searching `PATH` on Windows.
#[cfg(windows)]
const EXECUTABLE_EXTENSIONS: &[&str] = &["exe", "cmd", "bat"];

/// Probe that checks detection paths, then searches `PATH` for the
/// product's executable.
#[derive(Debug, Clone, Default)]
pub struct FilesystemProbe {
    search_path: Option<OsString>,
}

impl FilesystemProbe {
    /// Probe that searches the process `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe that searches the given directories instead of `PATH`.
    pub fn with_search_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dirs: Vec<PathBuf> = dirs.into_iter().map(Into::into).collect();
        Self {
            search_path: std::env::join_paths(dirs).ok(),
        }
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let path = match &self.search_path {
            Some(p) => Some(p.clone()),
            None => std::env::var_os("PATH"),
        };
        path.map(|p| {
            std::env::split_paths(&p)
                .filter(|d| !d.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
    }

    fn search_executable(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs()
            .into_iter()
            .find_map(|dir| executable_in(&dir, name))
    }
}

impl SystemProbe for FilesystemProbe {
    fn is_product_installed(&self, task: &TaskDescriptor) -> bool {
        let found = task.detect.paths.iter().any(|p| p.exists())
            || task
                .detect
                .executable
                .as_deref()
                .and_then(|name| self.search_executable(name))
                .is_some();
        trace!(product = %task.name, found, "detection probe");
        found
    }

    fn find_executable(&self, task: &TaskDescriptor) -> Option<PathBuf> {
        task.detect
            .paths
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .or_else(|| {
                task.detect
                    .executable
                    .as_deref()
                    .and_then(|name| self.search_executable(name))
            })
    }
}

#[cfg(not(windows))]
fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    candidate.is_file().then_some(candidate)
}

#[cfg(windows)]
fn executable_in(dir: &Path, name: &str) -> Option<PathBuf> {
    let plain = dir.join(name);
    if plain.is_file() {
        return Some(plain);
    }
    EXECUTABLE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task() -> TaskDescriptor {
        TaskDescriptor::new("Tool", "https://example.com/tool", "tool-setup")
    }

    #[test]
    fn test_not_installed_without_hints() {
        let probe = FilesystemProbe::with_search_dirs(Vec::<PathBuf>::new());
        assert!(!probe.is_product_installed(&task()));
        assert!(probe.find_executable(&task()).is_none());
    }

    #[test]
    fn test_detects_by_path() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("tool.bin");
        std::fs::write(&marker, b"x").unwrap();

        let probe = FilesystemProbe::with_search_dirs(Vec::<PathBuf>::new());
        let task = task().with_detect_path(&marker);

        assert!(probe.is_product_installed(&task));
        assert_eq!(probe.find_executable(&task), Some(marker));
    }

    #[test]
    fn test_detects_by_executable_on_search_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("tool"), b"x").unwrap();

        let probe = FilesystemProbe::with_search_dirs([temp.path()]);
        let task = task().with_executable("tool");

        assert!(probe.is_product_installed(&task));
        assert_eq!(probe.find_executable(&task), Some(temp.path().join("tool")));
    }

    #[test]
    fn test_directory_path_counts_as_installed_but_not_executable() {
        let temp = TempDir::new().unwrap();
        let probe = FilesystemProbe::with_search_dirs(Vec::<PathBuf>::new());
        let task = task().with_detect_path(temp.path());

        assert!(probe.is_product_installed(&task));
        assert!(probe.find_executable(&task).is_none());
    }
}
