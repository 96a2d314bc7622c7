//! Checksum verification for downloaded archives.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tokio::io::AsyncReadExt;

use crate::{KegError, Result};

/// Supported checksum types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumType {
    /// Detect checksum type from length of hex string
    pub fn from_hex_length(len: usize) -> Option<Self> {
        match len {
            32 => Some(ChecksumType::Md5),
            40 => Some(ChecksumType::Sha1),
            64 => Some(ChecksumType::Sha256),
            96 => Some(ChecksumType::Sha384),
            128 => Some(ChecksumType::Sha512),
            _ => None,
        }
    }

    /// Parse an algorithm name as written in a recipe (`md5`, `sha256`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(ChecksumType::Md5),
            "sha1" => Some(ChecksumType::Sha1),
            "sha256" => Some(ChecksumType::Sha256),
            "sha384" => Some(ChecksumType::Sha384),
            "sha512" => Some(ChecksumType::Sha512),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChecksumType::Md5 => "md5",
            ChecksumType::Sha1 => "sha1",
            ChecksumType::Sha256 => "sha256",
            ChecksumType::Sha384 => "sha384",
            ChecksumType::Sha512 => "sha512",
        }
    }

    fn hex_length(&self) -> usize {
        match self {
            ChecksumType::Md5 => 32,
            ChecksumType::Sha1 => 40,
            ChecksumType::Sha256 => 64,
            ChecksumType::Sha384 => 96,
            ChecksumType::Sha512 => 128,
        }
    }
}

/// An expected digest together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    kind: ChecksumType,
    digest: String,
}

impl Checksum {
    pub fn new(kind: ChecksumType, digest: impl Into<String>) -> Result<Self> {
        let digest = digest.into().to_ascii_lowercase();

        if digest.len() != kind.hex_length() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(KegError::InvalidDescriptor(format!(
                "'{}' is not a valid {} digest",
                digest,
                kind.name()
            )));
        }

        Ok(Self { kind, digest })
    }

    pub fn kind(&self) -> ChecksumType {
        self.kind
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Compare against a computed hex digest, ignoring case
    pub fn matches(&self, actual: &str) -> bool {
        self.digest.eq_ignore_ascii_case(actual)
    }
}

impl FromStr for Checksum {
    type Err = KegError;

    /// Accepts `algo:hex` or a bare hex digest whose length names the algorithm.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some((algo, digest)) = s.split_once(':') {
            let kind = ChecksumType::from_name(algo).ok_or_else(|| {
                KegError::InvalidDescriptor(format!("Unsupported checksum algorithm: {}", algo))
            })?;
            return Checksum::new(kind, digest);
        }

        let kind = ChecksumType::from_hex_length(s.len()).ok_or_else(|| {
            KegError::InvalidDescriptor(format!(
                "Cannot infer checksum algorithm from a {}-character digest",
                s.len()
            ))
        })?;
        Checksum::new(kind, s)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.digest)
    }
}

fn hex_digest<D: Digest>(bytes: &[u8]) -> String {
    let mut hasher = D::new();
    hasher.update(bytes);
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compute the hex digest of in-memory bytes
pub fn compute_checksum(bytes: &[u8], checksum_type: ChecksumType) -> String {
    match checksum_type {
        ChecksumType::Md5 => hex_digest::<Md5>(bytes),
        ChecksumType::Sha1 => hex_digest::<Sha1>(bytes),
        ChecksumType::Sha256 => hex_digest::<Sha256>(bytes),
        ChecksumType::Sha384 => hex_digest::<Sha384>(bytes),
        ChecksumType::Sha512 => hex_digest::<Sha512>(bytes),
    }
}

/// Compute the hex digest of a file on disk
pub async fn compute_file_checksum(path: &Path, checksum_type: ChecksumType) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).await?;

    Ok(compute_checksum(&buffer, checksum_type))
}

/// Verify a downloaded file. Returns the computed digest on success.
pub async fn verify_checksum(path: &Path, expected: &Checksum, url: &str) -> Result<String> {
    let actual = compute_file_checksum(path, expected.kind())
        .await
        .map_err(|e| KegError::Fetch {
            url: url.to_string(),
            reason: format!("downloaded archive is unreadable: {}", e),
        })?;

    if !expected.matches(&actual) {
        return Err(KegError::Integrity {
            url: url.to_string(),
            expected: expected.to_string(),
            actual: format!("{}:{}", expected.kind().name(), actual),
        });
    }

    Ok(actual)
}
