use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use serde::Serialize;

use crate::{KegError, Result};

/// Permissions applied to an installed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Scripts for the command search path
    Executable,
    /// Completions, docs and other non-executable files
    Data,
}

impl FileMode {
    /// Unix permission bits set on the installed copy
    pub fn bits(&self) -> u32 {
        match self {
            FileMode::Executable => 0o755,
            FileMode::Data => 0o644,
        }
    }
}

/// One `pattern -> destination directory` mapping of an install plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pattern: String,
    destination: PathBuf,
    mode: FileMode,
    rename: Option<String>,
}

impl PlanEntry {
    pub fn new(pattern: impl Into<String>, destination: impl Into<PathBuf>, mode: FileMode) -> Self {
        Self {
            pattern: pattern.into(),
            destination: destination.into(),
            mode,
            rename: None,
        }
    }

    /// Files installed with the executable bit set
    pub fn executable(pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self::new(pattern, destination, FileMode::Executable)
    }

    /// Files installed read/write for the owner, read-only for others
    pub fn data(pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self::new(pattern, destination, FileMode::Data)
    }

    /// Install the single matched file under a different name
    pub fn with_rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn rename(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// Compile the pattern; `*` never crosses a `/`
    pub fn matcher(&self) -> Result<GlobMatcher> {
        let glob = GlobBuilder::new(&self.pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| KegError::InvalidDescriptor(format!("invalid pattern '{}': {}", self.pattern, e)))?;
        Ok(glob.compile_matcher())
    }

    /// Whether the pattern's leading path segment matches the top-level
    /// directory `name`
    pub fn matches_top_level(&self, name: &str) -> bool {
        let first = self
            .pattern
            .split('/')
            .find(|segment| !segment.is_empty() && *segment != ".")
            .unwrap_or_default();
        // A segment cut out of a brace group does not compile on its own
        GlobBuilder::new(first)
            .literal_separator(true)
            .build()
            .map(|glob| glob.compile_matcher().is_match(name))
            .unwrap_or(false)
    }

    fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() || Path::new(&self.pattern).is_absolute() {
            return Err(KegError::InvalidDescriptor(format!(
                "pattern '{}' must be a relative path inside the archive",
                self.pattern
            )));
        }

        if !self.destination.is_absolute() {
            return Err(KegError::InvalidDescriptor(format!(
                "destination '{}' for pattern '{}' is not absolute",
                self.destination.display(),
                self.pattern
            )));
        }

        if let Some(name) = &self.rename {
            if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                return Err(KegError::InvalidDescriptor(format!(
                    "rename target '{}' must be a plain file name",
                    name
                )));
            }
        }

        self.matcher().map(|_| ())
    }
}

/// Ordered mapping of archive patterns to destination directories.
///
/// Entries are processed in declaration order. Every pattern must match at
/// least one file in the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan {
    entries: Vec<PlanEntry>,
}

impl InstallPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: PlanEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Check the plan before anything is fetched
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(KegError::InvalidDescriptor("install plan has no entries".to_string()));
        }

        self.entries.iter().try_for_each(PlanEntry::validate)
    }
}

impl FromIterator<PlanEntry> for InstallPlan {
    fn from_iter<I: IntoIterator<Item = PlanEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Record of one copied file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledFile {
    /// Path relative to the archive root
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Permission bits of the installed copy
    pub mode: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_mode_bits() {
        assert_eq!(FileMode::Executable.bits(), 0o755);
        assert_eq!(FileMode::Data.bits(), 0o644);
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let entry = PlanEntry::executable("bin/*", "/usr/local/bin");
        let matcher = entry.matcher().unwrap();

        assert!(matcher.is_match("bin/git-gerrit"));
        assert!(!matcher.is_match("bin/lib/helper"));
        assert!(!matcher.is_match("completion/git-gerrit-completion.bash"));
    }

    #[test]
    fn test_matches_top_level() {
        let entry = PlanEntry::executable("bin/*", "/usr/local/bin");
        assert!(entry.matches_top_level("bin"));
        assert!(!entry.matches_top_level("cognifloyd-git-gerrit-1a2b3c4"));

        let entry = PlanEntry::data("*/completion/*.bash", "/usr/local/etc");
        assert!(entry.matches_top_level("cognifloyd-git-gerrit-1a2b3c4"));

        let entry = PlanEntry::data("./share/doc", "/usr/local/share");
        assert!(entry.matches_top_level("share"));

        let entry = PlanEntry::data("{bin/a,share/b}", "/usr/local/share");
        assert!(!entry.matches_top_level("bin"));
    }

    #[test]
    fn test_plan_keeps_declaration_order() {
        let plan = InstallPlan::new()
            .with_entry(PlanEntry::executable("bin/*", "/usr/local/bin"))
            .with_entry(PlanEntry::data(
                "completion/git-gerrit-completion.bash",
                "/usr/local/etc/bash_completion.d",
            ));

        let patterns: Vec<_> = plan.entries().iter().map(PlanEntry::pattern).collect();
        assert_eq!(patterns, vec!["bin/*", "completion/git-gerrit-completion.bash"]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_plans() {
        assert!(InstallPlan::new().validate().is_err());

        let relative = InstallPlan::new().with_entry(PlanEntry::executable("bin/*", "bin"));
        assert!(relative.validate().is_err());

        let absolute_pattern = InstallPlan::new().with_entry(PlanEntry::data("/etc/passwd", "/tmp"));
        assert!(absolute_pattern.validate().is_err());

        let bad_glob = InstallPlan::new().with_entry(PlanEntry::data("bin/[", "/tmp"));
        assert!(bad_glob.validate().is_err());

        let bad_rename = InstallPlan::new()
            .with_entry(PlanEntry::data("README", "/tmp").with_rename("../README"));
        assert!(bad_rename.validate().is_err());
    }

    #[test]
    fn test_installed_file_serializes() {
        let file = InstalledFile {
            source: PathBuf::from("bin/git-gerrit"),
            destination: PathBuf::from("/usr/local/bin/git-gerrit"),
            mode: 0o755,
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["source"], "bin/git-gerrit");
        assert_eq!(json["mode"], 493);
    }
}
