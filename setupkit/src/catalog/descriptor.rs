//! Product descriptors.
//!
//! A [`TaskDescriptor`] is everything the engine knows about one product:
//! where its installer lives, how to run it silently, how to recognise an
//! existing installation, and which variant pipeline handles it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::orchestrator::Priority;

/// Which install pipeline variant handles a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Download and run silently, nothing else.
    #[default]
    Generic,
    /// Archive managers; registers file associations afterwards.
    ArchiveTool,
    /// Web browsers; applies password manager and sync preferences.
    BrowserTool,
    /// Hardware drivers; checked against the host before download.
    DriverUpdate,
    /// Uninstaller utilities; applies scan and monitoring settings.
    UninstallUtility,
}

impl TaskKind {
    /// All kinds, in declaration order.
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Generic,
        TaskKind::ArchiveTool,
        TaskKind::BrowserTool,
        TaskKind::DriverUpdate,
        TaskKind::UninstallUtility,
    ];

    /// Snake-case identifier, as used in catalog files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Generic => "generic",
            TaskKind::ArchiveTool => "archive_tool",
            TaskKind::BrowserTool => "browser_tool",
            TaskKind::DriverUpdate => "driver_update",
            TaskKind::UninstallUtility => "uninstall_utility",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog grouping shown to users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Browser,
    Archiver,
    Media,
    Communication,
    Security,
    Driver,
    Development,
    #[default]
    Utility,
}

impl Category {
    /// Snake-case identifier, as used in catalog files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Browser => "browser",
            Category::Archiver => "archiver",
            Category::Media => "media",
            Category::Communication => "communication",
            Category::Security => "security",
            Category::Driver => "driver",
            Category::Development => "development",
            Category::Utility => "utility",
        }
    }

    /// Parse a snake-case identifier (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        [
            Category::Browser,
            Category::Archiver,
            Category::Media,
            Category::Communication,
            Category::Security,
            Category::Driver,
            Category::Development,
            Category::Utility,
        ]
        .into_iter()
        .find(|c| c.as_str() == value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to recognise an existing installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionHints {
    /// Files or directories whose presence means "installed".
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Executable name looked up on `PATH`.
    #[serde(default)]
    pub executable: Option<String>,
}

impl DetectionHints {
    /// True when there is nothing to detect with.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.executable.is_none()
    }
}

/// Immutable description of one installable product.
///
/// Created once at catalog load and shared as `Arc<TaskDescriptor>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Display name; unique within a catalog.
    pub name: String,

    /// Installer source URL. May contain `{os}` / `{arch}` placeholders for
    /// variants that resolve it per host.
    pub url: String,

    /// Local file name of the downloaded payload; unique within a catalog.
    pub file_name: String,

    /// Arguments for a silent install.
    #[serde(default)]
    pub install_args: Vec<String>,

    /// Install ordering; larger goes first.
    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub kind: TaskKind,

    /// Expected lowercase or uppercase hex SHA-256 of the payload.
    #[serde(default)]
    pub sha256: Option<String>,

    /// Expected payload size in bytes.
    #[serde(default)]
    pub expected_size: Option<u64>,

    /// Free space the install needs, in bytes. Zero skips the check.
    #[serde(default)]
    pub required_disk_space: u64,

    #[serde(default)]
    pub detect: DetectionHints,

    /// Variant-specific settings.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl TaskDescriptor {
    /// Create a descriptor with defaults for everything but the essentials.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            file_name: file_name.into(),
            install_args: Vec::new(),
            priority: Priority::default(),
            category: Category::default(),
            kind: TaskKind::default(),
            sha256: None,
            expected_size: None,
            required_disk_space: 0,
            detect: DetectionHints::default(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Priority::new(priority);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    pub fn with_expected_size(mut self, bytes: u64) -> Self {
        self.expected_size = Some(bytes);
        self
    }

    pub fn with_required_disk_space(mut self, bytes: u64) -> Self {
        self.required_disk_space = bytes;
        self
    }

    pub fn with_detect_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.detect.paths.push(path.into());
        self
    }

    pub fn with_executable(mut self, name: impl Into<String>) -> Self {
        self.detect.executable = Some(name.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up a variant option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Comma-separated option split into trimmed, non-empty items.
    pub fn option_list(&self, key: &str) -> Vec<String> {
        self.option(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let d = TaskDescriptor::new("7-Zip", "https://example.com/7z.exe", "7z.exe")
            .with_args(["/S"])
            .with_priority(80)
            .with_kind(TaskKind::ArchiveTool)
            .with_category(Category::Archiver)
            .with_expected_size(1_500_000)
            .with_option("associations", "7z, zip,,rar ");

        assert_eq!(d.install_args, vec!["/S"]);
        assert_eq!(d.priority, Priority(80));
        assert_eq!(d.kind, TaskKind::ArchiveTool);
        assert_eq!(d.option_list("associations"), vec!["7z", "zip", "rar"]);
        assert!(d.option_list("missing").is_empty());
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let json = r#"{
            "name": "Tool",
            "url": "https://example.com/tool.exe",
            "file_name": "tool.exe"
        }"#;
        let d: TaskDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.kind, TaskKind::Generic);
        assert_eq!(d.category, Category::Utility);
        assert_eq!(d.priority, Priority::NORMAL);
        assert!(d.detect.is_empty());
        assert!(d.sha256.is_none());
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let kind: TaskKind = serde_json::from_str("\"uninstall_utility\"").unwrap();
        assert_eq!(kind, TaskKind::UninstallUtility);
        assert_eq!(
            serde_json::to_string(&TaskKind::DriverUpdate).unwrap(),
            "\"driver_update\""
        );
        for kind in TaskKind::ALL {
            let parsed: TaskKind =
                serde_json::from_str(&format!("\"{}\"", kind.as_str())).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Browser"), Some(Category::Browser));
        assert_eq!(Category::parse(" media "), Some(Category::Media));
        assert_eq!(Category::parse("games"), None);
    }
}
