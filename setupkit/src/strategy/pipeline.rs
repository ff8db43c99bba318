//! The install pipeline shared by every product.
//!
//! ```text
//! detect ──installed──► (reconfigure) ──► AlreadyInstalled
//!    │
//!    ▼
//! compatibility + disk space ─► resolve URL ─► download ─┬─► verify ─► execute ─► configure ─► detect
//!                                                        │
//!                                     failed (not cancelled)
//!                                                        ▼
//!                                              offline fallback payload
//! ```
//!
//! Progress checkpoints: 10 compatible, 15 URL resolved, 20-60 download,
//! 65 verified, 70-85 installer, 90 configured, 95 detecting, 100 done.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{ExecutionError, InstallError};
use super::state::{StateHandle, StrategyState};
use super::variants::InstallVariant;
use super::InstallerStrategy;
use crate::catalog::TaskDescriptor;
use crate::context::InstallContext;
use crate::download::FetchProgressCallback;
use crate::orchestrator::TaskResult;
use crate::probe::available_space;
use crate::BoxFuture;

const PROGRESS_COMPATIBLE: u8 = 10;
const PROGRESS_URL_RESOLVED: u8 = 15;
const PROGRESS_DOWNLOAD_START: u8 = 20;
const PROGRESS_DOWNLOAD_END: u8 = 60;
const PROGRESS_VERIFIED: u8 = 65;
const PROGRESS_EXECUTE_START: u8 = 70;
const PROGRESS_EXECUTE_END: u8 = 85;
const PROGRESS_CONFIGURED: u8 = 90;
const PROGRESS_DETECTING: u8 = 95;
const PROGRESS_DONE: u8 = 100;

/// Deletes a payload when the attempt ends, whatever the outcome.
struct PayloadGuard {
    path: PathBuf,
}

impl Drop for PayloadGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "payload removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove payload"),
        }
    }
}

/// Where an attempt's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadSource {
    Network,
    Fallback,
}

/// [`InstallerStrategy`] that runs the common pipeline with a variant's
/// hooks.
pub struct InstallPipeline {
    task: Arc<TaskDescriptor>,
    variant: Arc<dyn InstallVariant>,
    ctx: Arc<InstallContext>,
    state: StateHandle,
}

impl InstallPipeline {
    pub fn new(
        task: Arc<TaskDescriptor>,
        variant: Arc<dyn InstallVariant>,
        ctx: Arc<InstallContext>,
    ) -> Self {
        Self {
            task,
            variant,
            ctx,
            state: StateHandle::new(),
        }
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<TaskResult, InstallError> {
        let task = &self.task;

        // 1. Already there?
        if self.is_installed() {
            if self.variant.reconfigure_when_installed() {
                self.configure_best_effort();
            }
            self.state.advance(PROGRESS_DONE, "already installed");
            return Ok(TaskResult::AlreadyInstalled);
        }
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        // 2. Host checks
        self.variant.check_compatibility(task, self.ctx.host())?;
        self.check_disk_space()?;
        self.state.advance(PROGRESS_COMPATIBLE, "system compatible");

        // 3. Source
        let url = self.variant.resolve_url(task, self.ctx.host())?;
        self.state.advance(PROGRESS_URL_RESOLVED, "source resolved");

        // 4. Payload
        let (payload, source) = self.acquire_payload(&url, cancel).await?;
        let _cleanup = PayloadGuard {
            path: payload.clone(),
        };
        self.state.advance(PROGRESS_DOWNLOAD_END, "payload ready");

        // 5. Verify
        let bytes = self.ctx.verifier().verify(&payload, task).await?;
        self.state.advance(PROGRESS_VERIFIED, "payload verified");
        debug!(product = %task.name, bytes, ?source, "payload accepted");

        // 6. Execute
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        self.state.advance(PROGRESS_EXECUTE_START, "running installer");
        let outcome = self
            .ctx
            .runner()
            .run(
                &payload,
                &task.install_args,
                self.ctx.elevate(),
                self.ctx.install_timeout(),
                cancel,
            )
            .await
            .map_err(|e| match e {
                ExecutionError::Cancelled => InstallError::Cancelled,
                other => InstallError::Execution(other),
            })?;
        self.state.advance(PROGRESS_EXECUTE_END, "installer finished");

        // 7. Configure
        self.configure_best_effort();
        self.state.advance(PROGRESS_CONFIGURED, "configured");

        // 8. Confirm
        self.state.advance(PROGRESS_DETECTING, "confirming installation");
        if !self.is_installed() {
            return Err(InstallError::DetectionAmbiguous);
        }
        self.state.advance(PROGRESS_DONE, "installed");

        if outcome.reboot_required() {
            Ok(TaskResult::PartialSuccess)
        } else {
            Ok(TaskResult::Success)
        }
    }

    fn check_disk_space(&self) -> Result<(), InstallError> {
        let required = self.task.required_disk_space;
        if required == 0 {
            return Ok(());
        }
        match available_space(self.ctx.staging_dir()) {
            Some(free) if free < required => Err(InstallError::SystemRequirements(format!(
                "needs {} bytes of free space, {} available",
                required, free
            ))),
            Some(_) => Ok(()),
            None => {
                debug!(product = %self.task.name, "free space unknown, skipping check");
                Ok(())
            }
        }
    }

    /// Download the payload, or fall back to the offline copy.
    async fn acquire_payload(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, PayloadSource), InstallError> {
        self.state.advance(PROGRESS_DOWNLOAD_START, "downloading");

        let fetched = self
            .ctx
            .fetcher()
            .fetch(
                url,
                self.ctx.staging_dir(),
                &self.task.file_name,
                Some(self.download_progress()),
                cancel,
            )
            .await;

        match fetched {
            Ok(path) => Ok((path, PayloadSource::Network)),
            Err(e) if e.is_cancelled() => Err(InstallError::Cancelled),
            Err(e) => {
                warn!(product = %self.task.name, url, error = %e, "download failed, trying offline payload");
                match self.extract_fallback().await {
                    Some(path) => {
                        info!(product = %self.task.name, path = %path.display(), "using offline payload");
                        Ok((path, PayloadSource::Fallback))
                    }
                    None => Err(InstallError::Download(e)),
                }
            }
        }
    }

    async fn extract_fallback(&self) -> Option<PathBuf> {
        let resources = Arc::clone(self.ctx.resources());
        let task = Arc::clone(&self.task);
        match tokio::task::spawn_blocking(move || resources.extract_fallback(&task)).await {
            Ok(path) => path,
            Err(e) => {
                warn!(product = %self.task.name, error = %e, "fallback extraction panicked");
                None
            }
        }
    }

    /// Map download progress into the 20-60 band.
    fn download_progress(&self) -> FetchProgressCallback {
        let state = self.state.clone();
        Box::new(move |transferred: u64, total: Option<u64>, _speed: f64| {
            if let Some(total) = total.filter(|t| *t > 0) {
                let span = u64::from(PROGRESS_DOWNLOAD_END - PROGRESS_DOWNLOAD_START);
                let step = transferred.min(total) * span / total;
                state.advance_progress(PROGRESS_DOWNLOAD_START + step as u8);
            }
        })
    }

    fn configure_best_effort(&self) {
        if let Err(e) = self
            .variant
            .configure(&self.task, self.ctx.configurator().as_ref())
        {
            warn!(product = %self.task.name, error = %e, "post-install configuration failed");
        }
    }
}

impl InstallerStrategy for InstallPipeline {
    fn name(&self) -> &str {
        &self.task.name
    }

    fn descriptor(&self) -> &Arc<TaskDescriptor> {
        &self.task
    }

    fn is_installed(&self) -> bool {
        self.ctx.probe().is_product_installed(&self.task)
    }

    fn install<'a>(&'a self, cancel: &'a CancellationToken) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            self.state.begin_attempt();
            info!(product = %self.task.name, kind = %self.variant.kind(), "install attempt started");

            match self.run(cancel).await {
                Ok(result) => {
                    info!(product = %self.task.name, %result, "install attempt finished");
                    self.state.finish(result.to_string());
                    result
                }
                Err(e) => {
                    let result = e.task_result();
                    if result == TaskResult::Cancelled {
                        info!(product = %self.task.name, "install attempt cancelled");
                    } else {
                        warn!(product = %self.task.name, %result, error = %e, "install attempt failed");
                    }
                    self.state.finish(e.to_string());
                    result
                }
            }
        })
    }

    fn state(&self) -> StrategyState {
        self.state.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<StrategyState> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for InstallPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallPipeline")
            .field("task", &self.task.name)
            .field("kind", &self.variant.kind())
            .finish()
    }
}
