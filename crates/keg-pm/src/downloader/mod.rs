//! Archive downloading, verification and extraction.
//!
//! Fetches a release archive over HTTPS (or from a `file://` URL), checks
//! its digest against the descriptor and unpacks it into a scratch directory.

mod archive;
mod checksum;
mod file;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use checksum::{compute_checksum, compute_file_checksum, verify_checksum, Checksum, ChecksumType};
pub use file::FileDownloader;
