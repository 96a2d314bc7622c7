//! TOML recipe format.
//!
//! A recipe pairs a package descriptor with install entries whose
//! destinations are relative to an install prefix:
//!
//! ```toml
//! [package]
//! name = "git-gerrit"
//! version = "0.5.0"
//! url = "https://github.com/cognifloyd/git-gerrit/tarball/v0.5.0"
//! checksum = "md5:1d722ddb607536504ffd84957c536401"
//!
//! [[install]]
//! pattern = "bin/*"
//! to = "bin"
//! executable = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{InstallPlan, PackageDescriptor, PlanEntry};
use crate::{KegError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub package: RecipePackage,

    #[serde(default)]
    pub install: Vec<RecipeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipePackage {
    pub name: String,
    pub version: String,
    pub url: String,
    pub checksum: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeEntry {
    /// Glob relative to the archive root
    pub pattern: String,

    /// Destination directory; relative paths are joined to the prefix
    pub to: PathBuf,

    #[serde(default)]
    pub executable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl Recipe {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KegError::InvalidDescriptor(format!("cannot read recipe {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Build the descriptor on its own
    pub fn descriptor(&self) -> Result<PackageDescriptor> {
        let package = &self.package;
        let descriptor =
            PackageDescriptor::new(&package.name, &package.version, &package.url, &package.checksum)?;

        Ok(match &package.homepage {
            Some(homepage) => descriptor.with_homepage(homepage),
            None => descriptor,
        })
    }

    /// Resolve destinations against `prefix`, producing the descriptor and plan
    pub fn resolve(&self, prefix: &Path) -> Result<(PackageDescriptor, InstallPlan)> {
        if !prefix.is_absolute() {
            return Err(KegError::InvalidDescriptor(format!(
                "install prefix '{}' is not absolute",
                prefix.display()
            )));
        }

        let descriptor = self.descriptor()?;

        let plan: InstallPlan = self
            .install
            .iter()
            .map(|entry| {
                let destination = prefix.join(&entry.to);
                let plan_entry = if entry.executable {
                    PlanEntry::executable(&entry.pattern, destination)
                } else {
                    PlanEntry::data(&entry.pattern, destination)
                };
                match &entry.rename {
                    Some(name) => plan_entry.with_rename(name),
                    None => plan_entry,
                }
            })
            .collect();

        plan.validate()?;

        Ok((descriptor, plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::FileMode;

    const RECIPE: &str = r#"
[package]
name = "demo"
version = "1.2.0"
url = "https://example.test/demo-1.2.0.tar.gz"
checksum = "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"

[[install]]
pattern = "bin/*"
to = "bin"
executable = true

[[install]]
pattern = "share/demo.bash"
to = "/etc/bash_completion.d"
rename = "demo"
"#;

    #[test]
    fn test_parse_recipe() {
        let recipe = Recipe::from_toml(RECIPE).unwrap();
        assert_eq!(recipe.name(), "demo");
        assert_eq!(recipe.install.len(), 2);
        assert!(recipe.install[0].executable);
        assert!(!recipe.install[1].executable);
        assert_eq!(recipe.install[1].rename.as_deref(), Some("demo"));
    }

    #[test]
    fn test_resolve_against_prefix() {
        let recipe = Recipe::from_toml(RECIPE).unwrap();
        let (descriptor, plan) = recipe.resolve(Path::new("/opt/keg")).unwrap();

        assert_eq!(descriptor.version(), "1.2.0");

        let entries = plan.entries();
        assert_eq!(entries[0].destination(), Path::new("/opt/keg/bin"));
        assert_eq!(entries[0].mode(), FileMode::Executable);
        // absolute destinations are kept as-is
        assert_eq!(entries[1].destination(), Path::new("/etc/bash_completion.d"));
        assert_eq!(entries[1].mode(), FileMode::Data);
        assert_eq!(entries[1].rename(), Some("demo"));
    }

    #[test]
    fn test_resolve_requires_absolute_prefix() {
        let recipe = Recipe::from_toml(RECIPE).unwrap();
        assert!(matches!(
            recipe.resolve(Path::new("relative/prefix")),
            Err(KegError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let content = RECIPE.replace("executable = true", "executeable = true");
        assert!(matches!(Recipe::from_toml(&content), Err(KegError::Recipe(_))));
    }

    #[test]
    fn test_recipe_without_entries_fails_to_resolve() {
        let content = RECIPE.split("[[install]]").next().unwrap();
        let recipe = Recipe::from_toml(content).unwrap();
        assert!(recipe.resolve(Path::new("/usr/local")).is_err());
    }
}
