//! `cairn parent` - print the parent of the current branch.

use anyhow::Result;
use cairn_core::store::StackStore;
use cairn_git::GitOps;

use crate::commands::utils;
use crate::output;

/// Run the parent command.
pub fn run(dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let store = StackStore::new(&git);
    let current = git.current_branch()?;

    match store.parent_of(&current) {
        Some(parent) => println!("{}", output::branch(&parent)),
        None => println!(
            "{} {}",
            output::branch(&current),
            output::dim("(not in a stack)")
        ),
    }

    Ok(())
}
