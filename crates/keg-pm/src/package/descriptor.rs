use std::fmt;

use url::Url;

use crate::downloader::Checksum;
use crate::{KegError, Result};

/// What to install and where to fetch it from.
///
/// Built once from a recipe or constants and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    name: String,
    version: String,
    url: String,
    checksum: Checksum,
    homepage: Option<String>,
}

impl PackageDescriptor {
    /// Creates a descriptor, validating the URL and the checksum notation
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
        checksum: &str,
    ) -> Result<Self> {
        let name = name.into();
        let version = version.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(KegError::InvalidDescriptor("package name is empty".to_string()));
        }
        if version.trim().is_empty() {
            return Err(KegError::InvalidDescriptor(format!("{}: version is empty", name)));
        }

        let parsed = Url::parse(&url)
            .map_err(|e| KegError::InvalidDescriptor(format!("{}: invalid url '{}': {}", name, url, e)))?;
        if !matches!(parsed.scheme(), "https" | "http" | "file") {
            return Err(KegError::InvalidDescriptor(format!(
                "{}: unsupported url scheme '{}'",
                name,
                parsed.scheme()
            )));
        }

        let checksum = checksum.parse()?;

        Ok(Self {
            name,
            version,
            url,
            checksum,
            homepage: None,
        })
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::ChecksumType;

    #[test]
    fn test_new_descriptor() {
        let descriptor = PackageDescriptor::new(
            "git-gerrit",
            "0.5.0",
            "https://github.com/cognifloyd/git-gerrit/tarball/v0.5.0",
            "1d722ddb607536504ffd84957c536401",
        )
        .unwrap()
        .with_homepage("https://github.com/cognifloyd/git-gerrit");

        assert_eq!(descriptor.name(), "git-gerrit");
        assert_eq!(descriptor.version(), "0.5.0");
        assert_eq!(descriptor.checksum().kind(), ChecksumType::Md5);
        assert_eq!(descriptor.homepage(), Some("https://github.com/cognifloyd/git-gerrit"));
        assert_eq!(descriptor.to_string(), "git-gerrit 0.5.0");
    }

    #[test]
    fn test_rejects_invalid_fields() {
        let md5 = "d41d8cd98f00b204e9800998ecf8427e";

        assert!(PackageDescriptor::new("", "1.0", "https://x.test/a.tar.gz", md5).is_err());
        assert!(PackageDescriptor::new("pkg", " ", "https://x.test/a.tar.gz", md5).is_err());
        assert!(PackageDescriptor::new("pkg", "1.0", "not a url", md5).is_err());
        assert!(PackageDescriptor::new("pkg", "1.0", "ftp://x.test/a.tar.gz", md5).is_err());
        assert!(PackageDescriptor::new("pkg", "1.0", "https://x.test/a.tar.gz", "d41d8cd9").is_err());
    }
}
