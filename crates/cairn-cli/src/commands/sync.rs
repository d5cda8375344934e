//! `cairn sync` - sync the stack with its parents, origin, and PRs.

use anyhow::{Result, bail};
use cairn_core::sync::{SyncEngine, SyncMode};

use crate::commands::utils;
use crate::prompt::StdinPrompter;

/// Run the sync command.
pub fn run(force: bool, resume: bool, abort: bool, dry_run: bool, verbose: bool) -> Result<()> {
    if resume && abort {
        bail!("cannot use --resume and --abort together");
    }

    let git = utils::git_client(dry_run, verbose);
    let github = utils::github_client(&git, dry_run, verbose);

    let mode = if abort {
        SyncMode::Abort
    } else if resume {
        SyncMode::Resume
    } else {
        SyncMode::Fresh
    };

    let engine = SyncEngine::new(&git, &github, force, verbose);
    engine.run(mode, &StdinPrompter)?;
    Ok(())
}
