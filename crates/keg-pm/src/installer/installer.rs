use std::path::PathBuf;
use std::sync::Arc;

use crate::downloader::{ArchiveExtractor, ArchiveType, FileDownloader};
use crate::http::HttpClient;
use crate::package::{InstallPlan, InstalledFile, PackageDescriptor};
use crate::{KegError, Result};

use super::files::FileInstaller;

type ProgressFn = dyn Fn(u64, u64) + Send + Sync;

/// Runs the fetch, verify, extract and copy steps for one package.
///
/// Every call works in its own temporary directory, which is removed when the
/// call returns, successfully or not. Plan entries are installed in order and
/// the first failing entry aborts the rest; files already copied for earlier
/// entries are left in place.
pub struct Installer {
    downloader: FileDownloader,
    temp_root: Option<PathBuf>,
    progress: Option<Box<ProgressFn>>,
}

impl Installer {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self {
            downloader: FileDownloader::new(http_client),
            temp_root: None,
            progress: None,
        }
    }

    /// Create scratch directories under `dir` instead of the system temp dir
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Report `(downloaded, total)` byte counts while fetching
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub async fn install(
        &self,
        descriptor: &PackageDescriptor,
        plan: &InstallPlan,
    ) -> Result<Vec<InstalledFile>> {
        plan.validate()?;

        log::info!("Installing {} from {}", descriptor, descriptor.url());

        let workdir = self.scratch_dir()?;
        log::debug!("Working in {}", workdir.path().display());

        let archive = workdir.path().join("download");
        let info = self
            .downloader
            .download_verified(descriptor.url(), &archive, descriptor.checksum(), self.progress.as_deref())
            .await?;

        let archive_type = ArchiveType::detect(&archive, descriptor.url(), info.content_type.as_deref())?;
        let extract_dir = workdir.path().join("src");
        ArchiveExtractor::extract_with_type(&archive, &extract_dir, archive_type)?;
        let root = ArchiveExtractor::tree_root(&extract_dir, plan)?;

        let files = FileInstaller::new(root);
        let mut installed = Vec::new();

        for entry in plan.entries() {
            installed.extend(files.install_entry(entry).await?);
        }

        log::info!("Installed {} file(s) for {}", installed.len(), descriptor);

        Ok(installed)
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("keg-");

        match &self.temp_root {
            Some(dir) => builder.tempdir_in(dir).map_err(|e| KegError::filesystem(dir, e)),
            None => builder
                .tempdir()
                .map_err(|e| KegError::filesystem(std::env::temp_dir(), e)),
        }
    }
}
