//! Recipes command - list the recipes bundled with keg.

use anyhow::Result;
use clap::Args;
use console::style;

use keg_pm::recipes;

#[derive(Args, Debug)]
pub struct RecipesArgs {
    /// Only print recipe names
    #[arg(long)]
    pub name_only: bool,
}

pub async fn execute(args: RecipesArgs) -> Result<i32> {
    for name in recipes::builtin_names() {
        if args.name_only {
            println!("{}", name);
            continue;
        }

        let Some(recipe) = recipes::builtin(name)? else {
            continue;
        };

        let package = &recipe.package;
        println!(
            "{} {} {}",
            style(&package.name).white().bold(),
            style(&package.version).yellow(),
            style(package.homepage.as_deref().unwrap_or(&package.url)).dim()
        );
    }

    Ok(0)
}
