//! Recipes bundled with the binary.

use crate::package::Recipe;
use crate::Result;

const BUILTIN: &[(&str, &str)] = &[("git-gerrit", include_str!("../recipes/git-gerrit.toml"))];

/// Names of the bundled recipes
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Look up a bundled recipe by name
pub fn builtin(name: &str) -> Result<Option<Recipe>> {
    BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, content)| Recipe::from_toml(content))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::ChecksumType;
    use crate::package::FileMode;
    use std::path::Path;

    #[test]
    fn test_all_builtin_recipes_parse() {
        for name in builtin_names() {
            let recipe = builtin(name).unwrap().unwrap();
            assert_eq!(recipe.name(), name);
            assert!(recipe.resolve(Path::new("/usr/local")).is_ok());
        }
    }

    #[test]
    fn test_git_gerrit_recipe() {
        let recipe = builtin("git-gerrit").unwrap().unwrap();
        let (descriptor, plan) = recipe.resolve(Path::new("/usr/local")).unwrap();

        assert_eq!(descriptor.version(), "0.5.0");
        assert_eq!(descriptor.url(), "https://github.com/cognifloyd/git-gerrit/tarball/v0.5.0");
        assert_eq!(descriptor.checksum().kind(), ChecksumType::Md5);
        assert_eq!(descriptor.checksum().digest(), "1d722ddb607536504ffd84957c536401");

        let entries = plan.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].pattern(), "bin/*");
        assert_eq!(entries[0].destination(), Path::new("/usr/local/bin"));
        assert_eq!(entries[0].mode(), FileMode::Executable);
        assert_eq!(entries[1].destination(), Path::new("/usr/local/etc/bash_completion.d"));
        assert_eq!(entries[1].mode(), FileMode::Data);
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(builtin("no-such-recipe").unwrap().is_none());
    }
}
