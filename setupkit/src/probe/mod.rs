//! Collaborators the install pipeline consults about the local system.
//!
//! Each concern sits behind a narrow trait so pipelines can be driven by
//! mocks in tests:
//!
//! | Trait | Question answered | Default implementation |
//! |-------|-------------------|------------------------|
//! | [`SystemProbe`] | Is this product installed? Where is it? | [`FilesystemProbe`] |
//! | [`ResourceProvider`] | Is there an offline copy of the payload? | [`DirectoryResourceProvider`] |
//! | [`SystemConfigurator`] | Where do post-install settings go? | [`IniConfigurator`] |
//!
//! [`HostInfo`] carries the facts driver variants check compatibility
//! against.

mod configurator;
mod filesystem;
mod host;
mod resources;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::catalog::TaskDescriptor;

pub use configurator::{ConfigureError, IniConfigurator};
pub use filesystem::FilesystemProbe;
pub use host::{available_space, is_elevated, parse_version, HostInfo};
pub use resources::{DirectoryResourceProvider, NoFallback};

/// Detects existing installations.
pub trait SystemProbe: Send + Sync {
    /// True when the product is present on this system.
    fn is_product_installed(&self, task: &TaskDescriptor) -> bool;

    /// Location of the product's main executable, when it can be found.
    fn find_executable(&self, task: &TaskDescriptor) -> Option<PathBuf>;
}

/// Supplies offline installer payloads.
pub trait ResourceProvider: Send + Sync {
    /// Produce a copy of the fallback payload for `task`.
    ///
    /// The returned file belongs to the caller, which deletes it after the
    /// attempt. `None` means no fallback exists or it could not be produced.
    fn extract_fallback(&self, task: &TaskDescriptor) -> Option<PathBuf>;
}

/// Destination for post-install product settings.
pub trait SystemConfigurator: Send + Sync {
    /// Store `settings` under `section` for `product`.
    fn apply(
        &self,
        product: &str,
        section: &str,
        settings: &BTreeMap<String, String>,
    ) -> Result<(), ConfigureError>;
}
