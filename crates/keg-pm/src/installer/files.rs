//! File installer - copies matched archive files into destination directories.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::package::{FileMode, InstalledFile, PlanEntry};
use crate::{KegError, Result};

/// Copies files out of an extracted archive tree
pub struct FileInstaller {
    /// Root of the extracted archive
    root: PathBuf,
}

impl FileInstaller {
    /// Create a new file installer over an extracted tree
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Files matching the entry's pattern, relative to the root and sorted
    /// lexicographically.
    ///
    /// Symlinks count when they resolve to a regular file inside the tree;
    /// dangling links and links leaving the tree are skipped.
    pub fn resolve(&self, entry: &PlanEntry) -> Result<Vec<PathBuf>> {
        let matcher = entry.matcher()?;
        let canonical_root =
            std::fs::canonicalize(&self.root).map_err(|e| KegError::filesystem(&self.root, e))?;
        let mut matches = Vec::new();

        for item in WalkDir::new(&self.root).min_depth(1).follow_links(false) {
            let item = item.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
                KegError::filesystem(path, e.into())
            })?;

            let file_type = item.file_type();
            if file_type.is_symlink() {
                if !Self::links_into(item.path(), &canonical_root) {
                    log::debug!("Skipping symlink {} with no target file in the archive", item.path().display());
                    continue;
                }
            } else if !file_type.is_file() {
                continue;
            }

            let relative = item
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(item.path())
                .to_path_buf();

            if matcher.is_match(&relative) {
                matches.push(relative);
            }
        }

        matches.sort();

        if matches.is_empty() {
            return Err(KegError::PlanMismatch {
                pattern: entry.pattern().to_string(),
            });
        }

        if entry.rename().is_some() && matches.len() > 1 {
            return Err(KegError::AmbiguousRename {
                pattern: entry.pattern().to_string(),
                count: matches.len(),
            });
        }

        Ok(matches)
    }

    fn links_into(link: &Path, canonical_root: &Path) -> bool {
        match std::fs::canonicalize(link) {
            Ok(target) => target.starts_with(canonical_root) && target.is_file(),
            Err(_) => false,
        }
    }

    /// Install every file matched by one plan entry
    pub async fn install_entry(&self, entry: &PlanEntry) -> Result<Vec<InstalledFile>> {
        let matches = self.resolve(entry)?;

        log::debug!(
            "Pattern '{}' matched {} file(s) for {}",
            entry.pattern(),
            matches.len(),
            entry.destination().display()
        );

        let dest_dir = entry.destination();
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| KegError::filesystem(dest_dir, e))?;

        let mut installed = Vec::with_capacity(matches.len());

        for relative in matches {
            let file_name = match entry.rename() {
                Some(name) => std::ffi::OsString::from(name),
                None => relative
                    .file_name()
                    .map(|n| n.to_os_string())
                    .ok_or_else(|| KegError::PlanMismatch {
                        pattern: entry.pattern().to_string(),
                    })?,
            };

            let target = dest_dir.join(file_name);
            let mode = self.copy_file(&self.root.join(&relative), &target, entry.mode()).await?;

            log::debug!("Installed {} -> {} ({:o})", relative.display(), target.display(), mode);

            installed.push(InstalledFile {
                source: relative,
                destination: target,
                mode,
            });
        }

        Ok(installed)
    }

    /// Copy one file, replacing whatever sits at the target path
    async fn copy_file(&self, source: &Path, target: &Path, mode: FileMode) -> Result<u32> {
        // A read-only file or a symlink at the target would otherwise be
        // written through or refuse the copy.
        if tokio::fs::symlink_metadata(target).await.is_ok() {
            tokio::fs::remove_file(target)
                .await
                .map_err(|e| KegError::filesystem(target, e))?;
        }

        tokio::fs::copy(source, target)
            .await
            .map_err(|e| KegError::filesystem(target, e))?;

        self.set_mode(target, mode).await
    }

    #[cfg(unix)]
    async fn set_mode(&self, target: &Path, mode: FileMode) -> Result<u32> {
        use std::os::unix::fs::PermissionsExt;

        let bits = mode.bits();
        tokio::fs::set_permissions(target, std::fs::Permissions::from_mode(bits))
            .await
            .map_err(|e| KegError::filesystem(target, e))?;

        Ok(bits)
    }

    #[cfg(not(unix))]
    async fn set_mode(&self, target: &Path, _mode: FileMode) -> Result<u32> {
        let metadata = tokio::fs::metadata(target)
            .await
            .map_err(|e| KegError::filesystem(target, e))?;

        Ok(if metadata.permissions().readonly() { 0o444 } else { 0o644 })
    }
}
