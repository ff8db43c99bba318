//! Product-family hooks into the install pipeline.
//!
//! The pipeline is the same for every product; an [`InstallVariant`]
//! supplies the steps that differ. All hooks have no-op defaults, so
//! [`GenericVariant`] implements none of them.
//!
//! | Variant | Before download | After install |
//! |---------|-----------------|---------------|
//! | [`GenericVariant`] | - | - |
//! | [`ArchiveToolVariant`] | - | file associations |
//! | [`BrowserToolVariant`] | - | password manager / sync |
//! | [`DriverUpdateVariant`] | host compatibility, URL placeholders | - |
//! | [`UninstallUtilityVariant`] | - | scan level / monitoring |

use std::collections::BTreeMap;

use semver::Version;
use tracing::debug;

use super::error::InstallError;
use crate::catalog::{TaskDescriptor, TaskKind};
use crate::probe::{parse_version, HostInfo, SystemConfigurator};

/// Variant-specific steps of the install pipeline.
pub trait InstallVariant: Send + Sync {
    fn kind(&self) -> TaskKind;

    /// Reject hosts the product cannot be installed on.
    fn check_compatibility(
        &self,
        _task: &TaskDescriptor,
        _host: &HostInfo,
    ) -> Result<(), InstallError> {
        Ok(())
    }

    /// Source URL for this host.
    fn resolve_url(&self, task: &TaskDescriptor, _host: &HostInfo) -> Result<String, InstallError> {
        Ok(task.url.clone())
    }

    /// Post-install configuration. Failures are reported as
    /// [`InstallError::Configuration`] and never fail the install.
    fn configure(
        &self,
        _task: &TaskDescriptor,
        _configurator: &dyn SystemConfigurator,
    ) -> Result<(), InstallError> {
        Ok(())
    }

    /// Re-apply [`configure`](Self::configure) when the product turns out to
    /// be installed already.
    fn reconfigure_when_installed(&self) -> bool {
        false
    }
}

/// Download and run, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericVariant;

impl InstallVariant for GenericVariant {
    fn kind(&self) -> TaskKind {
        TaskKind::Generic
    }
}

/// Registers the product for the extensions in its `associations` option.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveToolVariant;

impl InstallVariant for ArchiveToolVariant {
    fn kind(&self) -> TaskKind {
        TaskKind::ArchiveTool
    }

    fn configure(
        &self,
        task: &TaskDescriptor,
        configurator: &dyn SystemConfigurator,
    ) -> Result<(), InstallError> {
        let extensions = task.option_list("associations");
        if extensions.is_empty() {
            return Ok(());
        }

        let settings: BTreeMap<String, String> = extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim_start_matches('.').to_ascii_lowercase();
                (format!(".{}", ext), task.name.clone())
            })
            .collect();

        configurator
            .apply(&task.name, "associations", &settings)
            .map_err(|e| InstallError::Configuration(e.to_string()))?;
        debug!(product = %task.name, count = settings.len(), "file associations registered");
        Ok(())
    }

    fn reconfigure_when_installed(&self) -> bool {
        true
    }
}

/// Applies the `password_manager` and `sync` preferences.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserToolVariant;

impl InstallVariant for BrowserToolVariant {
    fn kind(&self) -> TaskKind {
        TaskKind::BrowserTool
    }

    fn configure(
        &self,
        task: &TaskDescriptor,
        configurator: &dyn SystemConfigurator,
    ) -> Result<(), InstallError> {
        let mut settings = BTreeMap::new();
        for key in ["password_manager", "sync"] {
            if let Some(raw) = task.option(key) {
                let value = parse_switch(raw).ok_or_else(|| {
                    InstallError::Configuration(format!(
                        "{} must be enabled or disabled, got '{}'",
                        key, raw
                    ))
                })?;
                settings.insert(key.to_string(), switch_value(value).to_string());
            }
        }
        if settings.is_empty() {
            return Ok(());
        }

        configurator
            .apply(&task.name, "preferences", &settings)
            .map_err(|e| InstallError::Configuration(e.to_string()))
    }

    fn reconfigure_when_installed(&self) -> bool {
        true
    }
}

/// Checks the host against `os`, `architectures` and `min_os_version`,
/// and fills `{os}` / `{arch}` in the source URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverUpdateVariant;

impl InstallVariant for DriverUpdateVariant {
    fn kind(&self) -> TaskKind {
        TaskKind::DriverUpdate
    }

    fn check_compatibility(
        &self,
        task: &TaskDescriptor,
        host: &HostInfo,
    ) -> Result<(), InstallError> {
        let systems = task.option_list("os");
        if !systems.is_empty() && !systems.iter().any(|os| os.eq_ignore_ascii_case(&host.os)) {
            return Err(InstallError::SystemRequirements(format!(
                "requires {}, host is {}",
                systems.join(" or "),
                host.os
            )));
        }

        let architectures = task.option_list("architectures");
        if !architectures.is_empty()
            && !architectures.iter().any(|a| a.eq_ignore_ascii_case(&host.arch))
        {
            return Err(InstallError::SystemRequirements(format!(
                "requires {}, host is {}",
                architectures.join(" or "),
                host.arch
            )));
        }

        if let Some(raw) = task.option("min_os_version") {
            let minimum: Version = parse_version(raw).ok_or_else(|| {
                InstallError::SystemRequirements(format!("invalid min_os_version '{}'", raw))
            })?;
            match &host.os_version {
                Some(current) if *current >= minimum => {}
                Some(current) => {
                    return Err(InstallError::SystemRequirements(format!(
                        "requires OS version {} or later, host is {}",
                        minimum, current
                    )))
                }
                None => {
                    return Err(InstallError::SystemRequirements(format!(
                        "requires OS version {} or later, host version unknown",
                        minimum
                    )))
                }
            }
        }

        Ok(())
    }

    fn resolve_url(&self, task: &TaskDescriptor, host: &HostInfo) -> Result<String, InstallError> {
        Ok(task.url.replace("{os}", &host.os).replace("{arch}", &host.arch))
    }
}

/// Applies the `scan_level` and `monitoring` settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallUtilityVariant;

/// Accepted `scan_level` values.
const SCAN_LEVELS: [&str; 3] = ["safe", "moderate", "advanced"];

impl InstallVariant for UninstallUtilityVariant {
    fn kind(&self) -> TaskKind {
        TaskKind::UninstallUtility
    }

    fn configure(
        &self,
        task: &TaskDescriptor,
        configurator: &dyn SystemConfigurator,
    ) -> Result<(), InstallError> {
        let mut settings = BTreeMap::new();

        if let Some(raw) = task.option("scan_level") {
            let level = raw.trim().to_ascii_lowercase();
            if !SCAN_LEVELS.contains(&level.as_str()) {
                return Err(InstallError::Configuration(format!(
                    "scan_level must be one of {}, got '{}'",
                    SCAN_LEVELS.join(", "),
                    raw
                )));
            }
            settings.insert("scan_level".to_string(), level);
        }

        if let Some(raw) = task.option("monitoring") {
            let value = parse_switch(raw).ok_or_else(|| {
                InstallError::Configuration(format!(
                    "monitoring must be enabled or disabled, got '{}'",
                    raw
                ))
            })?;
            settings.insert("monitoring".to_string(), switch_value(value).to_string());
        }

        if settings.is_empty() {
            return Ok(());
        }
        configurator
            .apply(&task.name, "scanner", &settings)
            .map_err(|e| InstallError::Configuration(e.to_string()))
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "enabled" | "enable" | "true" | "on" | "yes" | "1" => Some(true),
        "disabled" | "disable" | "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn switch_value(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ConfigureError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingConfigurator {
        applied: Mutex<Vec<(String, String, BTreeMap<String, String>)>>,
    }

    impl SystemConfigurator for RecordingConfigurator {
        fn apply(
            &self,
            product: &str,
            section: &str,
            settings: &BTreeMap<String, String>,
        ) -> Result<(), ConfigureError> {
            self.applied
                .lock()
                .push((product.to_string(), section.to_string(), settings.clone()));
            Ok(())
        }
    }

    fn windows_host(version: Option<Version>) -> HostInfo {
        HostInfo::new("windows", "x86_64", version)
    }

    fn driver() -> TaskDescriptor {
        TaskDescriptor::new(
            "Driver",
            "https://drivers.example.com/{os}/{arch}/setup.exe",
            "driver.exe",
        )
        .with_kind(TaskKind::DriverUpdate)
        .with_option("os", "windows")
        .with_option("architectures", "x86_64, aarch64")
        .with_option("min_os_version", "10.0")
    }

    #[test]
    fn test_driver_accepts_compatible_host() {
        let host = windows_host(Some(Version::new(10, 0, 19045)));
        assert!(DriverUpdateVariant.check_compatibility(&driver(), &host).is_ok());
    }

    #[test]
    fn test_driver_rejects_wrong_os() {
        let host = HostInfo::new("linux", "x86_64", Some(Version::new(6, 8, 0)));
        let err = DriverUpdateVariant
            .check_compatibility(&driver(), &host)
            .unwrap_err();
        assert!(matches!(err, InstallError::SystemRequirements(_)));
    }

    #[test]
    fn test_driver_rejects_wrong_arch() {
        let host = HostInfo::new("windows", "x86", Some(Version::new(10, 0, 0)));
        assert!(DriverUpdateVariant.check_compatibility(&driver(), &host).is_err());
    }

    #[test]
    fn test_driver_rejects_old_or_unknown_version() {
        let old = windows_host(Some(Version::new(6, 1, 7601)));
        assert!(DriverUpdateVariant.check_compatibility(&driver(), &old).is_err());

        let unknown = windows_host(None);
        assert!(DriverUpdateVariant.check_compatibility(&driver(), &unknown).is_err());
    }

    #[test]
    fn test_driver_resolves_placeholders() {
        let host = windows_host(None);
        let url = DriverUpdateVariant.resolve_url(&driver(), &host).unwrap();
        assert_eq!(url, "https://drivers.example.com/windows/x86_64/setup.exe");
    }

    #[test]
    fn test_generic_uses_url_verbatim() {
        let task = driver();
        let url = GenericVariant.resolve_url(&task, &windows_host(None)).unwrap();
        assert_eq!(url, task.url);
        assert!(GenericVariant
            .check_compatibility(&task, &HostInfo::new("plan9", "mips", None))
            .is_ok());
    }

    #[test]
    fn test_archive_associations() {
        let configurator = RecordingConfigurator::default();
        let task = TaskDescriptor::new("7-Zip", "https://x/7z.exe", "7z.exe")
            .with_option("associations", "7z, .ZIP");

        ArchiveToolVariant.configure(&task, &configurator).unwrap();

        let applied = configurator.applied.lock();
        assert_eq!(applied.len(), 1);
        let (product, section, settings) = &applied[0];
        assert_eq!(product, "7-Zip");
        assert_eq!(section, "associations");
        assert_eq!(settings.get(".zip").map(String::as_str), Some("7-Zip"));
        assert_eq!(settings.get(".7z").map(String::as_str), Some("7-Zip"));
    }

    #[test]
    fn test_browser_preferences() {
        let configurator = RecordingConfigurator::default();
        let task = TaskDescriptor::new("Browser", "https://x/b.exe", "b.exe")
            .with_option("password_manager", "off")
            .with_option("sync", "Enabled");

        BrowserToolVariant.configure(&task, &configurator).unwrap();

        let applied = configurator.applied.lock();
        let settings = &applied[0].2;
        assert_eq!(settings["password_manager"], "disabled");
        assert_eq!(settings["sync"], "enabled");
    }

    #[test]
    fn test_browser_rejects_bad_switch() {
        let configurator = RecordingConfigurator::default();
        let task = TaskDescriptor::new("Browser", "https://x/b.exe", "b.exe")
            .with_option("sync", "sometimes");

        let err = BrowserToolVariant.configure(&task, &configurator).unwrap_err();
        assert!(matches!(err, InstallError::Configuration(_)));
        assert!(configurator.applied.lock().is_empty());
    }

    #[test]
    fn test_uninstall_utility_settings() {
        let configurator = RecordingConfigurator::default();
        let task = TaskDescriptor::new("Revo", "https://x/r.exe", "r.exe")
            .with_option("scan_level", "Advanced")
            .with_option("monitoring", "disabled");

        UninstallUtilityVariant.configure(&task, &configurator).unwrap();
        let applied = configurator.applied.lock();
        assert_eq!(applied[0].1, "scanner");
        assert_eq!(applied[0].2["scan_level"], "advanced");

        let bad = TaskDescriptor::new("Revo", "https://x/r.exe", "r.exe")
            .with_option("scan_level", "paranoid");
        assert!(UninstallUtilityVariant.configure(&bad, &configurator).is_err());
    }

    #[test]
    fn test_no_options_no_writes() {
        let configurator = RecordingConfigurator::default();
        let task = TaskDescriptor::new("Plain", "https://x/p.exe", "p.exe");
        ArchiveToolVariant.configure(&task, &configurator).unwrap();
        BrowserToolVariant.configure(&task, &configurator).unwrap();
        UninstallUtilityVariant.configure(&task, &configurator).unwrap();
        assert!(configurator.applied.lock().is_empty());
    }
}
