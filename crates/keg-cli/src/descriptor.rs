//! Resolve the `--descriptor` argument into a recipe.

use anyhow::{bail, Context, Result};
use std::path::Path;

use keg_pm::{recipes, Recipe};

/// Accepts a recipe file path, a built-in recipe name, or inline TOML, in that order.
pub fn load_recipe(arg: &str) -> Result<Recipe> {
    let path = Path::new(arg);
    if path.is_file() {
        return Recipe::from_file(path)
            .with_context(|| format!("Failed to load recipe {}", path.display()));
    }

    if let Some(recipe) = recipes::builtin(arg)? {
        log::debug!("Using built-in recipe {}", arg);
        return Ok(recipe);
    }

    if arg.contains("[package]") {
        return Recipe::from_toml(arg).context("Failed to parse inline recipe");
    }

    bail!(
        "'{}' is not a recipe file, a built-in recipe or an inline recipe (built-ins: {})",
        arg,
        recipes::builtin_names().collect::<Vec<_>>().join(", ")
    )
}
