//! Package installation.
//!
//! `Installer` drives the whole pipeline; `FileInstaller` copies matched
//! archive files into their destination directories.

mod files;
mod installer;

pub use files::FileInstaller;
pub use installer::Installer;
