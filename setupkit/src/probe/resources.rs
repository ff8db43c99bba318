//! Offline fallback payloads.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, warn};

use super::ResourceProvider;
use crate::catalog::TaskDescriptor;

/// Serves fallback payloads from a directory of bundled installers.
///
/// For a product with local file name `setup.exe` it looks for
/// `<fallback_dir>/setup.exe`, then `<fallback_dir>/setup.exe.gz`, and
/// copies or decompresses the first one found into `extract_dir`.
#[derive(Debug, Clone)]
pub struct DirectoryResourceProvider {
    fallback_dir: PathBuf,
    extract_dir: PathBuf,
}

impl DirectoryResourceProvider {
    pub fn new(fallback_dir: impl Into<PathBuf>, extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            fallback_dir: fallback_dir.into(),
            extract_dir: extract_dir.into(),
        }
    }

    pub fn fallback_dir(&self) -> &Path {
        &self.fallback_dir
    }

    fn extract(&self, task: &TaskDescriptor) -> io::Result<Option<PathBuf>> {
        let plain = self.fallback_dir.join(&task.file_name);
        let gzipped = self.fallback_dir.join(format!("{}.gz", task.file_name));
        let dest = self.extract_dir.join(&task.file_name);

        if plain.is_file() {
            std::fs::create_dir_all(&self.extract_dir)?;
            std::fs::copy(&plain, &dest)?;
            debug!(product = %task.name, source = %plain.display(), "copied fallback payload");
            return Ok(Some(dest));
        }

        if gzipped.is_file() {
            std::fs::create_dir_all(&self.extract_dir)?;
            if let Err(e) = decompress(&gzipped, &dest) {
                let _ = std::fs::remove_file(&dest);
                return Err(e);
            }
            debug!(product = %task.name, source = %gzipped.display(), "decompressed fallback payload");
            return Ok(Some(dest));
        }

        Ok(None)
    }
}

impl ResourceProvider for DirectoryResourceProvider {
    fn extract_fallback(&self, task: &TaskDescriptor) -> Option<PathBuf> {
        match self.extract(task) {
            Ok(path) => path,
            Err(e) => {
                warn!(product = %task.name, error = %e, "failed to extract fallback payload");
                None
            }
        }
    }
}

fn decompress(source: &Path, dest: &Path) -> io::Result<()> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(source)?));
    let mut writer = BufWriter::new(File::create(dest)?);
    io::copy(&mut decoder, &mut writer)?;
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}

/// Provider with no fallback payloads at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl ResourceProvider for NoFallback {
    fn extract_fallback(&self, _task: &TaskDescriptor) -> Option<PathBuf> {
        None
    }
}
