pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod package;
pub mod recipes;

pub use error::{InstallStep, KegError, Result};
pub use installer::Installer;
pub use package::{FileMode, InstallPlan, InstalledFile, PackageDescriptor, PlanEntry, Recipe};
