//! Bounded batch fetching.
//!
//! Runs up to `limit` fetches at once and reports each entry as it resolves,
//! success or failure. Used by the CLI `fetch` command to pre-stage payloads
//! without installing them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::DownloadError;
use super::progress::BatchProgressCallback;
use super::traits::Fetcher;

/// One entry of a batch: source URL and full destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Source URL.
    pub url: String,
    /// Destination path, including the file name.
    pub dest: PathBuf,
}

impl BatchEntry {
    /// Create a batch entry.
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
        }
    }
}

/// Outcome of every entry in a batch, keyed by entry id.
pub type BatchResults = BTreeMap<String, Result<PathBuf, DownloadError>>;

/// Fetches many payloads with a concurrency bound.
#[derive(Clone)]
pub struct BatchDownloader {
    fetcher: Arc<dyn Fetcher>,
}

impl BatchDownloader {
    /// Create a batch downloader on top of a fetcher.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch every entry, at most `limit` at a time.
    ///
    /// `on_progress` is called once per entry as it resolves, with a
    /// completed count that increases by one each time and ends at the
    /// number of entries.
    pub async fn fetch_all(
        &self,
        entries: BTreeMap<String, BatchEntry>,
        limit: usize,
        on_progress: Option<BatchProgressCallback>,
        cancel: &CancellationToken,
    ) -> BatchResults {
        let total = entries.len();
        let limit = limit.max(1);
        info!(total, limit, "starting batch download");

        let mut pending = stream::iter(entries.into_iter().map(|(id, entry)| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let result = match split_destination(&entry.dest) {
                    Ok((dir, file_name)) => {
                        fetcher
                            .fetch(&entry.url, &dir, &file_name, None, cancel)
                            .await
                    }
                    Err(e) => Err(e),
                };
                (id, result)
            }
        }))
        .buffer_unordered(limit);

        let mut results = BatchResults::new();
        let mut completed = 0usize;

        while let Some((id, result)) = pending.next().await {
            completed += 1;
            debug!(id = %id, completed, total, ok = result.is_ok(), "batch entry resolved");
            if let Some(cb) = &on_progress {
                cb(completed, total, &id, &result);
            }
            results.insert(id, result);
        }

        let failed = results.values().filter(|r| r.is_err()).count();
        info!(total, failed, "batch download finished");
        results
    }
}

/// Split a destination path into its directory and file name.
fn split_destination(dest: &Path) -> Result<(PathBuf, String), DownloadError> {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| DownloadError::InvalidFileName(dest.display().to_string()))?;
    let dir = dest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::FetchProgressCallback;
    use crate::BoxFuture;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fetcher that fails any URL containing "bad" and tracks concurrency.
    struct ScriptedFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
            dest_dir: &'a Path,
            file_name: &'a str,
            _on_progress: Option<FetchProgressCallback>,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<PathBuf, DownloadError>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if url.contains("bad") {
                    Err(DownloadError::Status {
                        url: url.to_string(),
                        status: 500,
                    })
                } else {
                    Ok(dest_dir.join(file_name))
                }
            })
        }
    }

    fn entries(n: usize) -> BTreeMap<String, BatchEntry> {
        (0..n)
            .map(|i| {
                let url = if i == 2 {
                    format!("http://mirror/bad-{}", i)
                } else {
                    format!("http://mirror/ok-{}", i)
                };
                (
                    format!("item{}", i),
                    BatchEntry::new(url, format!("/staging/item{}.bin", i)),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_all_reports_every_entry_once() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let batch = BatchDownloader::new(fetcher.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let results = batch
            .fetch_all(
                entries(6),
                2,
                Some(Box::new(
                    move |completed: usize,
                          total: usize,
                          id: &str,
                          result: &Result<PathBuf, DownloadError>| {
                        seen_clone
                            .lock()
                            .push((completed, total, id.to_string(), result.is_ok()));
                    },
                )),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(results.len(), 6);
        assert!(results["item2"].is_err());
        assert_eq!(
            results["item0"].as_ref().unwrap(),
            &PathBuf::from("/staging/item0.bin")
        );

        let seen = seen.lock();
        let counts: Vec<usize> = seen.iter().map(|(c, _, _, _)| *c).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
        assert!(seen.iter().all(|(_, total, _, _)| *total == 6));
        assert_eq!(seen.iter().filter(|(_, _, _, ok)| !ok).count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_respects_limit() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let batch = BatchDownloader::new(fetcher.clone());

        batch
            .fetch_all(entries(8), 3, None, &CancellationToken::new())
            .await;

        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
        assert!(fetcher.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_fetch_all_empty_batch() {
        let batch = BatchDownloader::new(Arc::new(ScriptedFetcher::new()));
        let results = batch
            .fetch_all(BTreeMap::new(), 4, None, &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_split_destination() {
        let (dir, name) = split_destination(Path::new("/staging/app.msi")).unwrap();
        assert_eq!(dir, PathBuf::from("/staging"));
        assert_eq!(name, "app.msi");

        assert!(split_destination(Path::new("/")).is_err());
    }
}
