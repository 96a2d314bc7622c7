// Package model: what to fetch, and where its files go.
//
// A `PackageDescriptor` identifies the archive, an `InstallPlan` maps archive
// paths to destination directories, and a `Recipe` is the TOML form of both.

mod descriptor;
mod plan;
mod recipe;

pub use descriptor::PackageDescriptor;
pub use plan::{FileMode, InstallPlan, InstalledFile, PlanEntry};
pub use recipe::{Recipe, RecipeEntry, RecipePackage};
