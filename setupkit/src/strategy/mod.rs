//! Per-product install strategies.
//!
//! An [`InstallerStrategy`] installs and detects one product. The only
//! production implementation is [`InstallPipeline`], which runs the common
//! download → verify → execute → configure → detect sequence and delegates
//! the product-family steps to an [`InstallVariant`]. The
//! [`StrategyRegistry`] picks the variant from the descriptor's
//! [`TaskKind`](crate::catalog::TaskKind).
//!
//! Strategies never return errors: every failure is an [`InstallError`]
//! converted to a [`TaskResult`] at the strategy boundary.

mod error;
mod execute;
mod pipeline;
mod registry;
mod state;
mod variants;
mod verify;

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::catalog::TaskDescriptor;
use crate::orchestrator::TaskResult;
use crate::BoxFuture;

pub use error::{ExecutionError, InstallError, VerificationError};
pub use execute::{
    CommandRunner, ExitOutcome, ProcessRunner, EXIT_REBOOT_INITIATED, EXIT_REBOOT_REQUIRED,
    EXIT_SUCCESS,
};
pub use pipeline::InstallPipeline;
pub use registry::{RegistryError, StrategyRegistry};
pub use state::{StateHandle, StrategyState};
pub use variants::{
    ArchiveToolVariant, BrowserToolVariant, DriverUpdateVariant, GenericVariant, InstallVariant,
    UninstallUtilityVariant,
};
pub use verify::{PayloadVerifier, DEFAULT_MIN_PAYLOAD_BYTES, DEFAULT_SIZE_TOLERANCE};

/// Installs and detects one product.
pub trait InstallerStrategy: Send + Sync {
    /// Product name.
    fn name(&self) -> &str;

    /// The product being installed.
    fn descriptor(&self) -> &Arc<TaskDescriptor>;

    /// True when the product is already present.
    fn is_installed(&self) -> bool;

    /// Run one install attempt.
    ///
    /// Each call is a fresh attempt: progress restarts from zero.
    fn install<'a>(&'a self, cancel: &'a CancellationToken) -> BoxFuture<'a, TaskResult>;

    /// Current progress snapshot.
    fn state(&self) -> StrategyState;

    /// Receiver notified on every progress change.
    fn subscribe(&self) -> watch::Receiver<StrategyState>;
}
