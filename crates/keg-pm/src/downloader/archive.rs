//! Archive extraction (zip, tar, tar.gz, tar.bz2, tar.xz).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::package::InstallPlan;
use crate::{KegError, Result};

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveType {
    /// Detect archive type from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let path_str = path.to_string_lossy().to_lowercase();

        if path_str.ends_with(".zip") {
            Some(ArchiveType::Zip)
        } else if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
            Some(ArchiveType::TarGz)
        } else if path_str.ends_with(".tar.bz2") || path_str.ends_with(".tbz2") {
            Some(ArchiveType::TarBz2)
        } else if path_str.ends_with(".tar.xz") || path_str.ends_with(".txz") {
            Some(ArchiveType::TarXz)
        } else if path_str.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    /// Detect archive type from content type header
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_lowercase();

        // Check more specific types first
        if ct.contains("gzip") || ct.contains("x-gzip") {
            Some(ArchiveType::TarGz)
        } else if ct.contains("bzip2") || ct.contains("x-bzip2") {
            Some(ArchiveType::TarBz2)
        } else if ct.contains("x-xz") {
            Some(ArchiveType::TarXz)
        } else if ct.contains("x-tar") {
            Some(ArchiveType::Tar)
        } else if ct.contains("zip") {
            Some(ArchiveType::Zip)
        } else {
            None
        }
    }

    /// Detect archive type from the leading bytes of the file
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveType::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(ArchiveType::TarBz2)
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            Some(ArchiveType::TarXz)
        } else if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveType::Zip)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    /// Detect the type of a downloaded archive.
    ///
    /// Content sniffing wins because release URLs such as `.../tarball/v1.0`
    /// carry no extension; the URL and the response content type are fallbacks.
    pub fn detect(archive_path: &Path, url: &str, content_type: Option<&str>) -> Result<Self> {
        let mut header = Vec::with_capacity(512);
        File::open(archive_path)
            .and_then(|f| f.take(512).read_to_end(&mut header))
            .map_err(|e| KegError::Extraction(format!("Failed to read archive: {}", e)))?;

        Self::from_magic(&header)
            .or_else(|| Self::from_path(Path::new(url_path(url))))
            .or_else(|| content_type.and_then(Self::from_content_type))
            .ok_or_else(|| KegError::Extraction(format!("Unsupported archive format: {}", url)))
    }
}

/// Strip query string and fragment so the extension check sees the path only
fn url_path(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

fn extraction_error(context: &str, err: impl std::fmt::Display) -> KegError {
    KegError::Extraction(format!("{}: {}", context, err))
}

/// Reject absolute paths and `..` components
fn is_safe_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract an archive with explicit type
    pub fn extract_with_type(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
    ) -> Result<()> {
        std::fs::create_dir_all(dest_dir)
            .map_err(|e| extraction_error("Failed to create extraction directory", e))?;

        log::debug!("Extracting {:?} archive into {}", archive_type, dest_dir.display());

        match archive_type {
            ArchiveType::Zip => Self::extract_zip(archive_path, dest_dir),
            ArchiveType::Tar => Self::extract_tar(Self::open(archive_path)?, dest_dir),
            ArchiveType::TarGz => {
                Self::extract_tar(GzDecoder::new(Self::open(archive_path)?), dest_dir)
            }
            ArchiveType::TarBz2 => {
                use bzip2::read::BzDecoder;
                Self::extract_tar(BzDecoder::new(Self::open(archive_path)?), dest_dir)
            }
            ArchiveType::TarXz => {
                use xz2::read::XzDecoder;
                Self::extract_tar(XzDecoder::new(Self::open(archive_path)?), dest_dir)
            }
        }
    }

    fn open(archive_path: &Path) -> Result<BufReader<File>> {
        let file = File::open(archive_path)
            .map_err(|e| extraction_error("Failed to open archive", e))?;
        Ok(BufReader::new(file))
    }

    /// Extract a zip archive
    fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
        let mut archive = zip::ZipArchive::new(Self::open(archive_path)?)
            .map_err(|e| extraction_error("Failed to open zip", e))?;

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| extraction_error("Failed to read zip entry", e))?;

            let relative_path = file.enclosed_name().ok_or_else(|| {
                KegError::Extraction(format!("Path traversal detected in archive: {}", file.name()))
            })?;

            if relative_path.as_os_str().is_empty() {
                continue;
            }

            let outpath = dest_dir.join(&relative_path);

            if file.is_dir() {
                std::fs::create_dir_all(&outpath)
                    .map_err(|e| extraction_error("Failed to create directory", e))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| extraction_error("Failed to create directory", e))?;
            }

            let mut outfile = File::create(&outpath)
                .map_err(|e| extraction_error("Failed to create file", e))?;
            std::io::copy(&mut file, &mut outfile)
                .map_err(|e| extraction_error("Failed to extract", e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = file.unix_mode() {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode & 0o777))
                        .map_err(|e| extraction_error("Failed to set permissions", e))?;
                }
            }
        }

        Ok(())
    }

    /// Extract from a tar reader (common implementation)
    fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        for entry in archive
            .entries()
            .map_err(|e| extraction_error("Failed to read tar", e))?
        {
            let mut entry = entry.map_err(|e| extraction_error("Failed to read tar entry", e))?;

            // GitHub tarballs carry a pax global header with the commit id
            if matches!(
                entry.header().entry_type(),
                tar::EntryType::XGlobalHeader | tar::EntryType::XHeader
            ) {
                continue;
            }

            let path = entry
                .path()
                .map_err(|e| extraction_error("Invalid path in tar", e))?
                .into_owned();

            if !is_safe_relative(&path) {
                return Err(KegError::Extraction(format!(
                    "Path traversal detected in archive: {}",
                    path.display()
                )));
            }

            let unpacked = entry
                .unpack_in(dest_dir)
                .map_err(|e| extraction_error("Failed to extract", e))?;

            if !unpacked {
                return Err(KegError::Extraction(format!(
                    "Path traversal detected: {} escapes destination directory",
                    path.display()
                )));
            }
        }

        Ok(())
    }

    /// Directory that plan patterns are resolved against.
    ///
    /// Release tarballs wrap everything in a single `owner-repo-ref/`
    /// directory; when that is the only top-level entry it becomes the root,
    /// unless a plan pattern starts with that directory's name.
    pub fn tree_root(dest_dir: &Path, plan: &InstallPlan) -> Result<PathBuf> {
        let mut entries = std::fs::read_dir(dest_dir)
            .map_err(|e| extraction_error("Failed to read extracted tree", e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| extraction_error("Failed to read extracted tree", e))?;

        if entries.len() == 1 {
            let entry = entries.remove(0);
            let file_type = entry
                .file_type()
                .map_err(|e| extraction_error("Failed to read extracted tree", e))?;
            if file_type.is_dir() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(claimed) = plan.entries().iter().find(|e| e.matches_top_level(&name)) {
                    log::debug!("Keeping top-level directory {}: matched by '{}'", name, claimed.pattern());
                    return Ok(dest_dir.to_path_buf());
                }
                return Ok(entry.path());
            }
        }

        Ok(dest_dir.to_path_buf())
    }
}
