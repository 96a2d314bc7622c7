//! keg - install pinned command-line extensions from release archives.

mod config;
mod descriptor;
mod install;
mod recipes;
mod show;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use console::style;

use keg_pm::KegError;

use install::InstallArgs;
use recipes::RecipesArgs;
use show::ShowArgs;

#[derive(Parser, Debug)]
#[command(name = "keg", version, about = "Install pinned command-line extensions from release archives")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, verify and install a package
    Install(InstallArgs),

    /// Show a recipe's descriptor and resolved install plan
    Show(ShowArgs),

    /// List built-in recipes
    Recipes(RecipesArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Exit code for a failed command: the step-specific code when the failure
/// came out of the install pipeline, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<KegError>())
        .map(KegError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Install(args) => install::execute(args, cli.quiet).await,
        Commands::Show(args) => show::execute(args).await,
        Commands::Recipes(args) => recipes::execute(args).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "keg", &mut std::io::stdout());
            Ok(0)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            if let Some(keg_err) = err.chain().find_map(|cause| cause.downcast_ref::<KegError>()) {
                log::debug!("{} step failed", keg_err.step());
            }
            eprintln!("{} {:#}", style("Error:").red().bold(), err);
            exit_code(&err)
        }
    };

    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from([
            "keg",
            "install",
            "--descriptor",
            "git-gerrit",
            "--dest-prefix",
            "/opt/keg",
            "--timeout",
            "60",
        ])
        .unwrap();

        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.descriptor, "git-gerrit");
                assert_eq!(args.dest_prefix.as_deref(), Some(std::path::Path::new("/opt/keg")));
                assert_eq!(args.timeout, Some(60));
                assert!(!args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_exit_code_from_pipeline_error() {
        let err = anyhow::Error::new(KegError::PlanMismatch {
            pattern: "bin/*".to_string(),
        })
        .context("Failed to install git-gerrit 0.5.0");
        assert_eq!(exit_code(&err), 5);

        let err = anyhow::anyhow!("bad flag");
        assert_eq!(exit_code(&err), 1);
    }
}
