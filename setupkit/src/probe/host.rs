//! Facts about the machine being provisioned.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

/// Operating system, architecture and OS version of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    /// OS family, as in `std::env::consts::OS` (`windows`, `linux`, `macos`).
    pub os: String,
    /// CPU architecture, as in `std::env::consts::ARCH` (`x86_64`, `aarch64`).
    pub arch: String,
    /// OS release, normalised to semver. `None` when it could not be read.
    pub os_version: Option<Version>,
}

impl HostInfo {
    pub fn new(
        os: impl Into<String>,
        arch: impl Into<String>,
        os_version: Option<Version>,
    ) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            os_version,
        }
    }

    /// Describe the running host.
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            os_version: detect_os_version(),
        }
    }
}

#[cfg(unix)]
fn detect_os_version() -> Option<Version> {
    let uts = nix::sys::utsname::uname().ok()?;
    parse_version(&uts.release().to_string_lossy())
}

#[cfg(not(unix))]
fn detect_os_version() -> Option<Version> {
    None
}

/// Extract a semver version from a free-form release string.
///
/// Missing minor/patch components become zero, so `"10"` parses as
/// `10.0.0` and `"6.8.0-45-generic"` as `6.8.0`.
pub fn parse_version(raw: &str) -> Option<Version> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

    let caps = pattern.captures(raw)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Free space available to unprivileged users on the filesystem holding
/// `path`, in bytes.
///
/// Walks up to the nearest existing ancestor so the staging directory need
/// not exist yet. `None` when the platform gives no answer.
#[cfg(unix)]
pub fn available_space(path: &Path) -> Option<u64> {
    let existing = path.ancestors().find(|p| p.exists())?;
    let stat = nix::sys::statvfs::statvfs(existing).ok()?;
    #[allow(clippy::unnecessary_cast)]
    let bytes = stat.blocks_available() as u64 * stat.fragment_size() as u64;
    Some(bytes)
}

#[cfg(not(unix))]
pub fn available_space(_path: &Path) -> Option<u64> {
    None
}

/// True when installers can run without an elevation prefix.
#[cfg(unix)]
pub fn is_elevated() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_variants() {
        assert_eq!(parse_version("10"), Some(Version::new(10, 0, 0)));
        assert_eq!(parse_version("10.0.19045"), Some(Version::new(10, 0, 19045)));
        assert_eq!(
            parse_version("6.8.0-45-generic"),
            Some(Version::new(6, 8, 0))
        );
        assert_eq!(parse_version("Darwin 23.4"), Some(Version::new(23, 4, 0)));
        assert_eq!(parse_version("unknown"), None);
    }

    #[test]
    fn test_detect_uses_build_target() {
        let host = HostInfo::detect();
        assert_eq!(host.os, std::env::consts::OS);
        assert_eq!(host.arch, std::env::consts::ARCH);
    }

    #[cfg(unix)]
    #[test]
    fn test_available_space_walks_to_existing_ancestor() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("not/yet/created");
        assert!(available_space(&missing).is_some());
    }
}
