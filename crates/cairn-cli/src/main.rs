//! cairn - stacked branches that stay in sync with their pull requests.

use clap::Parser;

mod commands;
mod output;
mod prompt;

use commands::{Cli, Commands};

fn main() {
    // Respect NO_COLOR (https://no-color.org/)
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let verbose = cli.verbose;

    // Every command operates on the enclosing repository.
    if let Err(e) = commands::utils::ensure_in_repository() {
        output::error(&e.to_string());
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Create { name, parent } => {
            commands::create::run(&name, parent.as_deref(), dry_run, verbose)
        }
        Commands::Sync {
            force,
            resume,
            abort,
        } => commands::sync::run(force, resume, abort, dry_run, verbose),
        Commands::Reparent { new_parent } => {
            commands::reparent::run(&new_parent, dry_run, verbose)
        }
        Commands::Rename { new_name } => commands::rename::run(&new_name, dry_run, verbose),
        Commands::Parent => commands::parent::run(dry_run, verbose),
        Commands::Up => commands::navigate::run_up(dry_run, verbose),
        Commands::Down => commands::navigate::run_down(dry_run, verbose),
        Commands::Prune { all, force } => commands::prune::run(all, force, dry_run, verbose),
        Commands::Show => commands::show::run(dry_run, verbose),
    };

    if let Err(e) = result {
        std::process::exit(report(&e));
    }
}

/// Print the error (unless it was already reported) and map it to the
/// exit code: 1 for user and state errors, 2 for tool failures.
fn report(err: &anyhow::Error) -> i32 {
    use cairn_core::Error as CoreError;

    if let Some(core) = err.downcast_ref::<CoreError>() {
        match core {
            // The engine already printed the resume and abort recipes.
            CoreError::RebaseConflict => return 1,
            CoreError::Git(_) | CoreError::GitHub(_) | CoreError::PushFailed { .. } => {
                output::error(&format!("{err:#}"));
                return 2;
            }
            _ => {
                output::error(&format!("{err:#}"));
                return 1;
            }
        }
    }
    if err.downcast_ref::<cairn_git::Error>().is_some()
        || err.downcast_ref::<cairn_github::Error>().is_some()
    {
        output::error(&format!("{err:#}"));
        return 2;
    }
    output::error(&format!("{err:#}"));
    1
}
