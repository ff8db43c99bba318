//! Streaming HTTP downloader with atomic commit.
//!
//! Each fetch writes into a `<file_name>.tmp` sibling of the target and only
//! renames it into place once the whole body has been flushed to disk. The
//! temp file is removed by a scope guard no matter how the fetch ends.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::DownloadConfig;
use super::error::DownloadError;
use super::progress::{FetchProgressCallback, ProgressThrottle};
use super::state::DownloadState;
use super::traits::Fetcher;
use crate::BoxFuture;

/// Buffer size for writing downloads to disk (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Suffix appended to the target file name while a fetch is in flight.
pub const TEMP_SUFFIX: &str = ".tmp";

/// HTTP payload downloader.
///
/// Cloning is cheap and clones share the connection pool and the global
/// download slots.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    slots: Arc<Semaphore>,
    config: DownloadConfig,
}

impl HttpDownloader {
    /// Create a downloader with default settings.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(DownloadConfig::default())
    }

    /// Create a downloader with custom settings.
    pub fn with_config(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DownloadError::Client(e.to_string()))?;

        Ok(Self {
            client,
            slots: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            config,
        })
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Global limit on simultaneous fetches.
    pub fn max_concurrent_downloads(&self) -> usize {
        self.config.max_concurrent_downloads.max(1)
    }

    /// Number of download slots currently free.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Fetch `url` into `dest_dir/file_name`.
    ///
    /// Waits for a global download slot first; the wait itself is
    /// cancellable. Returns the committed path on success.
    pub async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        file_name: &str,
        on_progress: Option<FetchProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        validate_file_name(file_name)?;

        let mut state = DownloadState::new();

        let _slot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            permit = self.slots.acquire() => permit.map_err(|_| DownloadError::Cancelled)?,
        };

        fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| DownloadError::CreateDir {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;

        let target = dest_dir.join(file_name);
        let temp = dest_dir.join(format!("{}{}", file_name, TEMP_SUFFIX));
        let _guard = TempFileGuard::new(temp.clone());

        debug!(url, target = %target.display(), "starting download");

        let streamed = self
            .stream_to_file(url, &temp, &mut state, on_progress.as_ref(), cancel)
            .await;

        if let Err(e) = streamed {
            if e.is_cancelled() {
                state.cancel();
                debug!(url, "download cancelled");
            } else {
                state.fail();
                warn!(url, error = %e, "download failed");
            }
            return Err(e);
        }

        commit(&temp, &target).await?;
        state.complete();

        debug!(
            url,
            bytes = state.bytes_transferred,
            elapsed_ms = state.elapsed().as_millis() as u64,
            "download complete"
        );

        Ok(target)
    }

    /// Stream the response body into the temp file.
    async fn stream_to_file(
        &self,
        url: &str,
        temp: &Path,
        state: &mut DownloadState,
        on_progress: Option<&FetchProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let timeout_secs = self.config.timeout.as_secs();
        state.start();

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            sent = self.client.get(url).send() => {
                sent.map_err(|e| DownloadError::from_reqwest(url, e, timeout_secs))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        state.begin_body(response.content_length());

        let write_err = |e: io::Error| DownloadError::Write {
            path: temp.to_path_buf(),
            source: e,
        };

        let file = File::create(temp).await.map_err(write_err)?;
        let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);
        let mut throttle = ProgressThrottle::new(self.config.progress_interval);

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                chunk = response.chunk() => {
                    chunk.map_err(|e| DownloadError::from_reqwest(url, e, timeout_secs))?
                }
            };

            let Some(chunk) = chunk else {
                break;
            };

            writer.write_all(&chunk).await.map_err(write_err)?;
            state.record_chunk(chunk.len());

            if let Some(cb) = on_progress {
                if throttle.ready() {
                    cb(state.bytes_transferred, state.total_bytes, state.speed);
                }
            }
        }

        writer.flush().await.map_err(write_err)?;
        writer.into_inner().sync_all().await.map_err(write_err)?;

        if let Some(total) = state.total_bytes {
            if state.bytes_transferred != total {
                return Err(DownloadError::Http {
                    url: url.to_string(),
                    reason: format!(
                        "incomplete body: received {} of {} bytes",
                        state.bytes_transferred, total
                    ),
                });
            }
        }

        // The final report is never throttled.
        if let Some(cb) = on_progress {
            let total = state.total_bytes.unwrap_or(state.bytes_transferred);
            cb(state.bytes_transferred, Some(total), state.speed);
        }

        Ok(())
    }
}

impl Fetcher for HttpDownloader {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest_dir: &'a Path,
        file_name: &'a str,
        on_progress: Option<FetchProgressCallback>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<PathBuf, DownloadError>> {
        Box::pin(HttpDownloader::fetch(
            self,
            url,
            dest_dir,
            file_name,
            on_progress,
            cancel,
        ))
    }
}

/// Replace any existing target with the finished temp file.
async fn commit(temp: &Path, target: &Path) -> Result<(), DownloadError> {
    match fs::remove_file(target).await {
        Ok(()) => debug!(target = %target.display(), "replaced existing payload"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(DownloadError::Write {
                path: target.to_path_buf(),
                source: e,
            })
        }
    }

    fs::rename(temp, target)
        .await
        .map_err(|e| DownloadError::Write {
            path: target.to_path_buf(),
            source: e,
        })
}

/// Reject file names that would escape the destination directory.
fn validate_file_name(file_name: &str) -> Result<(), DownloadError> {
    let invalid = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(&['/', '\\'][..]);
    if invalid {
        return Err(DownloadError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

/// Removes the temp file when dropped.
struct TempFileGuard {
    path: PathBuf,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temp file"),
        }
    }
}
