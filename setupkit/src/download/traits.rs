//! Trait seam between install pipelines and the network.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::error::DownloadError;
use super::progress::FetchProgressCallback;
use crate::BoxFuture;

/// Fetches an installer payload to a local path.
///
/// [`HttpDownloader`](super::HttpDownloader) is the production
/// implementation; pipelines hold an `Arc<dyn Fetcher>` so tests can swap in
/// a scripted one.
pub trait Fetcher: Send + Sync {
    /// Fetch `url` into `dest_dir/file_name` and return the committed path.
    ///
    /// Implementations must honour `cancel` at every suspension point and
    /// return [`DownloadError::Cancelled`] when it fires.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest_dir: &'a Path,
        file_name: &'a str,
        on_progress: Option<FetchProgressCallback>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<PathBuf, DownloadError>>;
}
