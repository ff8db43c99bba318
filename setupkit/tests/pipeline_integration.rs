//! Integration tests for install pipelines with real collaborators.
//!
//! Payloads come over HTTP from a local axum server, detection uses the
//! filesystem probe, fallbacks come from a bundle directory and settings land
//! in INI files. Only the installer process itself is simulated.
//!
//! Run with: `cargo test --test pipeline_integration`

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use ini::Ini;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use setupkit::catalog::{TaskDescriptor, TaskKind};
use setupkit::download::{sha256_file, HttpDownloader};
use setupkit::probe::{DirectoryResourceProvider, FilesystemProbe, HostInfo, IniConfigurator};
use setupkit::strategy::{
    CommandRunner, ExecutionError, ExitOutcome, InstallerStrategy, PayloadVerifier,
    StrategyRegistry,
};
use setupkit::{BoxFuture, InstallContext, TaskResult};

// ============================================================================
// Test Server
// ============================================================================

/// Serves `/payload/<bytes>`; anything else is a 404.
async fn serve_payload(
    State(hits): State<Arc<AtomicUsize>>,
    UrlPath(size): UrlPath<usize>,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, vec![0x5au8; size])
}

/// Serves a driver package for `windows/x86_64` only.
async fn serve_driver(
    State(hits): State<Arc<AtomicUsize>>,
    UrlPath((os, arch)): UrlPath<(String, String)>,
) -> impl IntoResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    if os == "windows" && arch == "x86_64" {
        (StatusCode::OK, vec![0x11u8; 4096])
    } else {
        (StatusCode::NOT_FOUND, Vec::new())
    }
}

async fn start_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/payload/:size", get(serve_payload))
        .route("/driver/:os/:arch", get(serve_driver))
        .with_state(Arc::clone(&hits));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

// ============================================================================
// Simulated Installer
// ============================================================================

/// Pretends to install by creating the product's detection marker.
struct MarkerRunner {
    marker: PathBuf,
    creates_marker: bool,
    exit_code: i32,
    runs: Mutex<Vec<(PathBuf, Vec<String>, u64)>>,
}

impl MarkerRunner {
    fn new(marker: PathBuf) -> Self {
        Self {
            marker,
            creates_marker: true,
            exit_code: 0,
            runs: Mutex::new(Vec::new()),
        }
    }

    fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

impl CommandRunner for MarkerRunner {
    fn run<'a>(
        &'a self,
        program: &'a Path,
        args: &'a [String],
        _elevated: bool,
        _timeout: Duration,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<ExitOutcome, ExecutionError>> {
        Box::pin(async move {
            let size = std::fs::metadata(program).map(|m| m.len()).unwrap_or(0);
            self.runs
                .lock()
                .unwrap()
                .push((program.to_path_buf(), args.to_vec(), size));
            if self.creates_marker {
                std::fs::create_dir_all(self.marker.parent().unwrap()).unwrap();
                std::fs::write(&self.marker, b"installed").unwrap();
            }
            Ok(ExitOutcome {
                code: self.exit_code,
            })
        })
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    temp: TempDir,
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Fixture {
    async fn new() -> Self {
        let (addr, hits) = start_server().await;
        Self {
            temp: TempDir::new().unwrap(),
            addr,
            hits,
        }
    }

    fn url(&self, size: usize) -> String {
        format!("http://{}/payload/{}", self.addr, size)
    }

    fn missing_url(&self) -> String {
        format!("http://{}/nothing-here.exe", self.addr)
    }

    fn staging(&self) -> PathBuf {
        self.temp.path().join("staging")
    }

    fn marker(&self) -> PathBuf {
        self.temp.path().join("programs").join("tool").join("tool.bin")
    }

    fn bundle(&self) -> PathBuf {
        self.temp.path().join("bundle")
    }

    fn settings(&self) -> PathBuf {
        self.temp.path().join("settings")
    }

    fn task(&self, url: String) -> TaskDescriptor {
        TaskDescriptor::new("Tool", url, "tool-setup.exe")
            .with_args(["/S"])
            .with_detect_path(self.marker())
    }

    fn context(&self, runner: Arc<MarkerRunner>, verifier: PayloadVerifier) -> Arc<InstallContext> {
        Arc::new(
            InstallContext::builder(self.staging())
                .fetcher(Arc::new(HttpDownloader::new().unwrap()))
                .probe(Arc::new(FilesystemProbe::with_search_dirs(Vec::<PathBuf>::new())))
                .resources(Arc::new(DirectoryResourceProvider::new(
                    self.bundle(),
                    self.staging().join("fallback"),
                )))
                .configurator(Arc::new(IniConfigurator::new(self.settings())))
                .runner(runner)
                .host(HostInfo::new("windows", "x86_64", None))
                .verifier(verifier)
                .build()
                .unwrap(),
        )
    }

    fn strategy(
        &self,
        task: TaskDescriptor,
        runner: Arc<MarkerRunner>,
        verifier: PayloadVerifier,
    ) -> Arc<dyn InstallerStrategy> {
        StrategyRegistry::with_defaults()
            .build(Arc::new(task), self.context(runner, verifier))
            .unwrap()
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                found.extend(files_under(&path));
            } else {
                found.push(path);
            }
        }
    }
    found
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Download, verify, run, configure and detect, then clean the payload up.
#[tokio::test]
async fn test_full_install_over_http() {
    let fx = Fixture::new().await;
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let task = fx
        .task(fx.url(8192))
        .with_kind(TaskKind::ArchiveTool)
        .with_expected_size(8000)
        .with_option("associations", "zip, .7Z");
    let strategy = fx.strategy(task, Arc::clone(&runner), PayloadVerifier::new());

    assert!(!strategy.is_installed());
    let result = strategy.install(&CancellationToken::new()).await;

    assert_eq!(result, TaskResult::Success);
    assert!(strategy.is_installed());
    assert_eq!(strategy.state().progress, 100);
    assert_eq!(fx.hits.load(Ordering::SeqCst), 1);

    let runs = runner.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, fx.staging().join("tool-setup.exe"));
    assert_eq!(runs[0].1, vec!["/S".to_string()]);
    assert_eq!(runs[0].2, 8192);

    let settings = Ini::load_from_file(
        IniConfigurator::new(fx.settings()).settings_path("Tool"),
    )
    .unwrap();
    assert_eq!(settings.get_from(Some("associations"), ".zip"), Some("Tool"));
    assert_eq!(settings.get_from(Some("associations"), ".7z"), Some("Tool"));

    assert!(files_under(&fx.staging()).is_empty());
}

/// An installed product is left alone: no request, no installer run.
#[tokio::test]
async fn test_already_installed_is_idempotent() {
    let fx = Fixture::new().await;
    std::fs::create_dir_all(fx.marker().parent().unwrap()).unwrap();
    std::fs::write(fx.marker(), b"present").unwrap();

    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let strategy = fx.strategy(fx.task(fx.url(4096)), Arc::clone(&runner), PayloadVerifier::new());

    for _ in 0..2 {
        assert_eq!(
            strategy.install(&CancellationToken::new()).await,
            TaskResult::AlreadyInstalled
        );
    }
    assert_eq!(fx.hits.load(Ordering::SeqCst), 0);
    assert_eq!(runner.run_count(), 0);
    assert_eq!(strategy.state().progress, 100);
}

/// A failed download falls back to the gzipped bundle copy.
#[tokio::test]
async fn test_download_failure_uses_gzipped_fallback() {
    let fx = Fixture::new().await;
    std::fs::create_dir_all(fx.bundle()).unwrap();
    let file = std::fs::File::create(fx.bundle().join("tool-setup.exe.gz")).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&vec![0x42u8; 6000]).unwrap();
    encoder.finish().unwrap();

    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let strategy = fx.strategy(
        fx.task(fx.missing_url()),
        Arc::clone(&runner),
        PayloadVerifier::new(),
    );

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::Success
    );

    let runs = runner.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, fx.staging().join("fallback").join("tool-setup.exe"));
    assert_eq!(runs[0].2, 6000);

    // Bundle kept, extracted copy removed.
    assert!(fx.bundle().join("tool-setup.exe.gz").is_file());
    assert!(files_under(&fx.staging()).is_empty());
}

/// Without a fallback a failed download is reported as such.
#[tokio::test]
async fn test_download_failure_without_fallback() {
    let fx = Fixture::new().await;
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let strategy = fx.strategy(
        fx.task(fx.missing_url()),
        Arc::clone(&runner),
        PayloadVerifier::new(),
    );

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::DownloadFailed
    );
    assert_eq!(runner.run_count(), 0);
}

/// 950 bytes against an expected 1000 is within 10%; against 850 it is not.
#[tokio::test]
async fn test_size_tolerance() {
    let fx = Fixture::new().await;
    let verifier = PayloadVerifier::new();

    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let within = fx.strategy(
        fx.task(fx.url(950)).with_expected_size(1000),
        Arc::clone(&runner),
        verifier.clone(),
    );
    assert_eq!(
        within.install(&CancellationToken::new()).await,
        TaskResult::Success
    );

    std::fs::remove_file(fx.marker()).unwrap();
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let outside = fx.strategy(
        fx.task(fx.url(950)).with_expected_size(850),
        Arc::clone(&runner),
        verifier,
    );
    assert_eq!(
        outside.install(&CancellationToken::new()).await,
        TaskResult::DownloadFailed
    );
    assert_eq!(runner.run_count(), 0);
    assert!(files_under(&fx.staging()).is_empty());
}

/// Payloads below the minimum size are rejected before anything runs.
#[tokio::test]
async fn test_tiny_payload_rejected() {
    let fx = Fixture::new().await;
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let strategy = fx.strategy(fx.task(fx.url(100)), Arc::clone(&runner), PayloadVerifier::new());

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::DownloadFailed
    );
    assert_eq!(runner.run_count(), 0);
}

/// A checksum is enforced when the descriptor carries one.
#[tokio::test]
async fn test_checksum_enforced() {
    let fx = Fixture::new().await;

    let reference = fx.temp.path().join("reference.bin");
    std::fs::write(&reference, vec![0x5au8; 2048]).unwrap();
    let digest = sha256_file(&reference).unwrap();

    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let good = fx.strategy(
        fx.task(fx.url(2048)).with_sha256(digest.to_uppercase()),
        Arc::clone(&runner),
        PayloadVerifier::new(),
    );
    assert_eq!(good.install(&CancellationToken::new()).await, TaskResult::Success);

    std::fs::remove_file(fx.marker()).unwrap();
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let bad = fx.strategy(
        fx.task(fx.url(2048)).with_sha256("00".repeat(32)),
        Arc::clone(&runner),
        PayloadVerifier::new(),
    );
    assert_eq!(
        bad.install(&CancellationToken::new()).await,
        TaskResult::DownloadFailed
    );
    assert_eq!(runner.run_count(), 0);
}

/// A clean exit that leaves the product undetected is a failed install.
#[tokio::test]
async fn test_undetected_after_install() {
    let fx = Fixture::new().await;
    let mut runner = MarkerRunner::new(fx.marker());
    runner.creates_marker = false;
    let runner = Arc::new(runner);
    let strategy = fx.strategy(fx.task(fx.url(4096)), Arc::clone(&runner), PayloadVerifier::new());

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::InstallationFailed
    );
    assert_eq!(runner.run_count(), 1);
    assert!(files_under(&fx.staging()).is_empty());
}

/// Reboot-required exit codes still count as installed, partially.
#[tokio::test]
async fn test_reboot_required_is_partial_success() {
    let fx = Fixture::new().await;
    let mut runner = MarkerRunner::new(fx.marker());
    runner.exit_code = 3010;
    let strategy = fx.strategy(fx.task(fx.url(4096)), Arc::new(runner), PayloadVerifier::new());

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::PartialSuccess
    );
}

/// Driver updates resolve their URL from the host platform.
#[tokio::test]
async fn test_driver_update_url_resolution() {
    let fx = Fixture::new().await;
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let task = fx
        .task(format!("http://{}/driver/{{os}}/{{arch}}", fx.addr))
        .with_kind(TaskKind::DriverUpdate)
        .with_option("os", "windows")
        .with_option("architectures", "x86_64,aarch64");
    let strategy = fx.strategy(task, Arc::clone(&runner), PayloadVerifier::new());

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::Success
    );
    assert_eq!(fx.hits.load(Ordering::SeqCst), 1);
    assert_eq!(runner.runs.lock().unwrap()[0].2, 4096);
}

/// Incompatible hosts are rejected before any request.
#[tokio::test]
async fn test_driver_update_wrong_os() {
    let fx = Fixture::new().await;
    let runner = Arc::new(MarkerRunner::new(fx.marker()));
    let task = fx
        .task(format!("http://{}/driver/{{os}}/{{arch}}", fx.addr))
        .with_kind(TaskKind::DriverUpdate)
        .with_option("os", "linux");
    let strategy = fx.strategy(task, Arc::clone(&runner), PayloadVerifier::new());

    assert_eq!(
        strategy.install(&CancellationToken::new()).await,
        TaskResult::SystemRequirementsNotMet
    );
    assert_eq!(fx.hits.load(Ordering::SeqCst), 0);
    assert_eq!(runner.run_count(), 0);
}
