//! Show command - print a recipe's resolved descriptor and install plan.

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::PathBuf;

use keg_pm::FileMode;

use crate::config::{KegConfig, PREFIX_ENV};
use crate::descriptor::load_recipe;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Recipe file, built-in recipe name, or inline TOML recipe
    #[arg(short = 'd', long, value_name = "DESCRIPTOR")]
    pub descriptor: String,

    /// Install prefix used to resolve destinations
    #[arg(long, value_name = "DIR")]
    pub dest_prefix: Option<PathBuf>,
}

pub async fn execute(args: ShowArgs) -> Result<i32> {
    let config = KegConfig::load_from_cwd()?.unwrap_or_default();
    let cwd = std::env::current_dir()?;
    let prefix = config.resolve_prefix(args.dest_prefix.as_deref(), std::env::var_os(PREFIX_ENV), &cwd)?;

    let (descriptor, plan) = load_recipe(&args.descriptor)?.resolve(&prefix)?;

    println!("{} : {}", style("name    ").cyan(), descriptor.name());
    println!("{} : {}", style("version ").cyan(), descriptor.version());
    println!("{} : {}", style("url     ").cyan(), descriptor.url());
    println!("{} : {}", style("checksum").cyan(), descriptor.checksum());
    if let Some(homepage) = descriptor.homepage() {
        println!("{} : {}", style("homepage").cyan(), homepage);
    }

    println!();
    println!("{}", style("Install plan").green().bold());
    for entry in plan.entries() {
        let mode = match entry.mode() {
            FileMode::Executable => style("exec").yellow(),
            FileMode::Data => style("data").dim(),
        };
        let target = match entry.rename() {
            Some(name) => entry.destination().join(name),
            None => entry.destination().to_path_buf(),
        };
        println!("  {} {} -> {}", mode, entry.pattern(), target.display());
    }

    Ok(0)
}
