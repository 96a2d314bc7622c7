//! Install command - fetch a recipe's archive and copy its files into place.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

use keg_pm::http::HttpClient;
use keg_pm::Installer;

use crate::config::{KegConfig, PREFIX_ENV};
use crate::descriptor::load_recipe;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Recipe file, built-in recipe name, or inline TOML recipe
    #[arg(short = 'd', long, value_name = "DESCRIPTOR")]
    pub descriptor: String,

    /// Install prefix (defaults to $KEG_PREFIX, keg.toml, then /usr/local)
    #[arg(long, value_name = "DIR")]
    pub dest_prefix: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Allow downloads over plain http://
    #[arg(long)]
    pub allow_insecure_http: bool,

    /// Print the installed files as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: InstallArgs, quiet: bool) -> Result<i32> {
    let config = KegConfig::load_from_cwd()?.unwrap_or_default();
    let cwd = std::env::current_dir()?;
    let prefix = config.resolve_prefix(args.dest_prefix.as_deref(), std::env::var_os(PREFIX_ENV), &cwd)?;

    let recipe = load_recipe(&args.descriptor)?;
    let (descriptor, plan) = recipe.resolve(&prefix)?;

    let http_client = HttpClient::with_config(config.http_client_config(args.timeout, args.allow_insecure_http))
        .context("Failed to create HTTP client")?;

    let interactive = !args.json && !quiet;

    if interactive {
        println!(
            "{} Installing {} into {}",
            style("keg").green().bold(),
            style(&descriptor).white().bold(),
            prefix.display()
        );
    }

    let mut installer = Installer::new(Arc::new(http_client));
    let progress = interactive.then(download_bar);

    if let Some(bar) = progress.clone() {
        installer = installer.with_progress(move |downloaded, total| {
            if total > 0 {
                bar.set_length(total);
            }
            bar.set_position(downloaded);
        });
    }

    let result = installer.install(&descriptor, &plan).await;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let installed = result.with_context(|| format!("Failed to install {}", descriptor))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&installed)?);
    } else if !quiet {
        for file in &installed {
            println!(
                "  {} {} {}",
                style("+").green(),
                file.destination.display(),
                style(format!("({:o})", file.mode)).dim()
            );
        }
        println!(
            "{} Installed {} file(s) for {}",
            style("Success:").green().bold(),
            installed.len(),
            descriptor
        );
    }

    Ok(0)
}

fn download_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message("downloading");
    bar
}
