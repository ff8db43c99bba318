//! The collaborator bundle shared by every install pipeline.
//!
//! Built once at startup and handed to strategies as `Arc<InstallContext>`.
//! Defaults cover a real install run; tests swap individual collaborators
//! through [`InstallContextBuilder`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{default_settings_dir, default_staging_dir, ConfigFile};
use crate::download::{DownloadError, Fetcher, HttpDownloader};
use crate::probe::{
    DirectoryResourceProvider, FilesystemProbe, HostInfo, IniConfigurator, NoFallback,
    ResourceProvider, SystemConfigurator, SystemProbe,
};
use crate::strategy::{CommandRunner, PayloadVerifier, ProcessRunner};

/// Default time an installer may run (10 minutes).
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Name of the directory under the staging directory that receives
/// extracted fallback payloads.
const FALLBACK_SUBDIR: &str = "fallback";

/// Errors building an [`InstallContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to create downloader: {0}")]
    Downloader(#[from] DownloadError),
}

/// Everything an install pipeline needs from the outside world.
pub struct InstallContext {
    fetcher: Arc<dyn Fetcher>,
    probe: Arc<dyn SystemProbe>,
    resources: Arc<dyn ResourceProvider>,
    configurator: Arc<dyn SystemConfigurator>,
    runner: Arc<dyn CommandRunner>,
    host: HostInfo,
    verifier: PayloadVerifier,
    staging_dir: PathBuf,
    install_timeout: Duration,
    elevate: bool,
}

impl InstallContext {
    /// Start building a context that stages payloads in `staging_dir`.
    pub fn builder(staging_dir: impl Into<PathBuf>) -> InstallContextBuilder {
        InstallContextBuilder::new(staging_dir)
    }

    /// Build the production context described by a config file.
    pub fn from_config(config: &ConfigFile) -> Result<Self, ContextError> {
        let staging_dir = config
            .download
            .staging_dir
            .clone()
            .unwrap_or_else(default_staging_dir);
        let settings_dir = config
            .resources
            .settings_dir
            .clone()
            .unwrap_or_else(default_settings_dir);

        let mut builder = Self::builder(&staging_dir)
            .fetcher(Arc::new(HttpDownloader::with_config(config.download_config())?))
            .configurator(Arc::new(IniConfigurator::new(settings_dir)))
            .runner(Arc::new(
                ProcessRunner::new().with_hard_cancel(config.install.hard_cancel),
            ))
            .verifier(
                PayloadVerifier::new()
                    .with_min_size(config.download.min_payload_bytes)
                    .with_size_tolerance(config.download.size_tolerance),
            )
            .install_timeout(Duration::from_secs(config.install.install_timeout_secs))
            .elevate(config.install.elevate);

        if let Some(fallback_dir) = &config.resources.fallback_dir {
            builder = builder.resources(Arc::new(DirectoryResourceProvider::new(
                fallback_dir,
                staging_dir.join(FALLBACK_SUBDIR),
            )));
        }

        builder.build()
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn probe(&self) -> &Arc<dyn SystemProbe> {
        &self.probe
    }

    pub fn resources(&self) -> &Arc<dyn ResourceProvider> {
        &self.resources
    }

    pub fn configurator(&self) -> &Arc<dyn SystemConfigurator> {
        &self.configurator
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    pub fn host(&self) -> &HostInfo {
        &self.host
    }

    pub fn verifier(&self) -> &PayloadVerifier {
        &self.verifier
    }

    /// Directory downloads are staged in.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn install_timeout(&self) -> Duration {
        self.install_timeout
    }

    /// Whether installers run elevated.
    pub fn elevate(&self) -> bool {
        self.elevate
    }

    /// Remove the staging directory and everything left in it.
    pub async fn dispose(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.staging_dir).await {
            Ok(()) => {
                info!(path = %self.staging_dir.display(), "staging directory removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallContext")
            .field("host", &self.host)
            .field("verifier", &self.verifier)
            .field("staging_dir", &self.staging_dir)
            .field("install_timeout", &self.install_timeout)
            .field("elevate", &self.elevate)
            .finish_non_exhaustive()
    }
}

/// Builder for [`InstallContext`].
///
/// Unset collaborators default to: [`HttpDownloader`], [`FilesystemProbe`],
/// [`NoFallback`], [`IniConfigurator`] in the default settings directory,
/// [`ProcessRunner`], and [`HostInfo::detect`].
pub struct InstallContextBuilder {
    staging_dir: PathBuf,
    fetcher: Option<Arc<dyn Fetcher>>,
    probe: Option<Arc<dyn SystemProbe>>,
    resources: Option<Arc<dyn ResourceProvider>>,
    configurator: Option<Arc<dyn SystemConfigurator>>,
    runner: Option<Arc<dyn CommandRunner>>,
    host: Option<HostInfo>,
    verifier: PayloadVerifier,
    install_timeout: Duration,
    elevate: bool,
}

impl InstallContextBuilder {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            fetcher: None,
            probe: None,
            resources: None,
            configurator: None,
            runner: None,
            host: None,
            verifier: PayloadVerifier::default(),
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
            elevate: true,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn SystemProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn configurator(mut self, configurator: Arc<dyn SystemConfigurator>) -> Self {
        self.configurator = Some(configurator);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn host(mut self, host: HostInfo) -> Self {
        self.host = Some(host);
        self
    }

    pub fn verifier(mut self, verifier: PayloadVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn elevate(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    pub fn build(self) -> Result<InstallContext, ContextError> {
        let fetcher = match self.fetcher {
            Some(f) => f,
            None => Arc::new(HttpDownloader::new()?),
        };
        let host = self.host.unwrap_or_else(HostInfo::detect);
        debug!(
            os = %host.os,
            arch = %host.arch,
            os_version = ?host.os_version,
            staging = %self.staging_dir.display(),
            "install context ready"
        );

        Ok(InstallContext {
            fetcher,
            probe: self.probe.unwrap_or_else(|| Arc::new(FilesystemProbe::new())),
            resources: self.resources.unwrap_or_else(|| Arc::new(NoFallback)),
            configurator: self
                .configurator
                .unwrap_or_else(|| Arc::new(IniConfigurator::new(default_settings_dir()))),
            runner: self.runner.unwrap_or_else(|| Arc::new(ProcessRunner::new())),
            host,
            verifier: self.verifier,
            staging_dir: self.staging_dir,
            install_timeout: self.install_timeout,
            elevate: self.elevate,
        })
    }
}
