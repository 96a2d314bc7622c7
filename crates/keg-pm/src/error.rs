use std::path::PathBuf;

use thiserror::Error;

/// Pipeline step an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    Configure,
    Fetch,
    Verify,
    Extract,
    Install,
}

impl InstallStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStep::Configure => "configure",
            InstallStep::Fetch => "fetch",
            InstallStep::Verify => "verify",
            InstallStep::Extract => "extract",
            InstallStep::Install => "install",
        }
    }
}

impl std::fmt::Display for InstallStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum KegError {
    // Descriptor / recipe errors
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Failed to parse recipe: {0}")]
    Recipe(#[from] toml::de::Error),

    // Network errors
    #[error("Download failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    // Integrity errors
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    // Archive errors
    #[error("Extraction failed: {0}")]
    Extraction(String),

    // Plan errors
    #[error("Pattern '{pattern}' matched no files in the archive")]
    PlanMismatch { pattern: String },

    #[error("Pattern '{pattern}' matched {count} files but renames to a single target")]
    AmbiguousRename { pattern: String, count: usize },

    // Filesystem errors during the copy step
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KegError {
    /// Wrap an I/O error raised while touching `path`.
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KegError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// The step of the installation that failed.
    pub fn step(&self) -> InstallStep {
        match self {
            KegError::InvalidDescriptor(_) | KegError::Recipe(_) => InstallStep::Configure,
            KegError::Fetch { .. } => InstallStep::Fetch,
            KegError::Integrity { .. } => InstallStep::Verify,
            KegError::Extraction(_) => InstallStep::Extract,
            KegError::PlanMismatch { .. }
            | KegError::AmbiguousRename { .. }
            | KegError::Filesystem { .. } => InstallStep::Install,
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            KegError::InvalidDescriptor(_) | KegError::Recipe(_) => 1,
            KegError::Fetch { .. } => 2,
            KegError::Integrity { .. } => 3,
            KegError::Extraction(_) => 4,
            KegError::PlanMismatch { .. } | KegError::AmbiguousRename { .. } => 5,
            KegError::Filesystem { .. } => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, KegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_step() {
        let fetch = KegError::Fetch {
            url: "https://example.test/a.tar.gz".to_string(),
            reason: "HTTP 404".to_string(),
        };
        let integrity = KegError::Integrity {
            url: "https://example.test/a.tar.gz".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let extraction = KegError::Extraction("corrupt".to_string());
        let mismatch = KegError::PlanMismatch {
            pattern: "bin/*".to_string(),
        };
        let fs = KegError::filesystem(
            "/usr/local/bin/x",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );

        assert_eq!(fetch.exit_code(), 2);
        assert_eq!(integrity.exit_code(), 3);
        assert_eq!(extraction.exit_code(), 4);
        assert_eq!(mismatch.exit_code(), 5);
        assert_eq!(fs.exit_code(), 6);
        assert_eq!(KegError::InvalidDescriptor("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_step_names() {
        let err = KegError::PlanMismatch {
            pattern: "bin/*".to_string(),
        };
        assert_eq!(err.step(), InstallStep::Install);
        assert_eq!(err.step().to_string(), "install");

        let err = KegError::Extraction("bad".to_string());
        assert_eq!(err.step(), InstallStep::Extract);
    }

    #[test]
    fn test_error_display_includes_cause() {
        let err = KegError::Integrity {
            url: "https://example.test/pkg.tar.gz".to_string(),
            expected: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            actual: "1d722ddb607536504ffd84957c536401".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("d41d8cd98f00b204e9800998ecf8427e"));
        assert!(msg.contains("1d722ddb607536504ffd84957c536401"));

        let err = KegError::filesystem(
            "/opt/bin/tool",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().starts_with("Filesystem error at /opt/bin/tool"));
    }
}
