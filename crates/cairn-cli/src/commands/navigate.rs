//! `cairn up` and `cairn down` - walk the stack.

use anyhow::{Result, bail};
use cairn_core::prompt::Prompter;
use cairn_core::store::StackStore;
use cairn_git::GitOps;

use crate::commands::utils;
use crate::output;
use crate::prompt::StdinPrompter;

/// Check out the parent branch of the current branch.
pub fn run_up(dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let store = StackStore::new(&git);
    let current = git.current_branch()?;

    let Some(parent) = store.parent_of(&current) else {
        bail!("already at stack root (no parent for {current})");
    };

    git.checkout(&parent)?;
    output::success(&format!("Switched to parent branch: {parent}"));
    Ok(())
}

/// Check out a child branch of the current branch, prompting when there
/// is more than one.
pub fn run_down(dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let store = StackStore::new(&git);
    let current = git.current_branch()?;

    let children = store.children_of(&current)?;
    let target = match children.len() {
        0 => bail!("no children (tip of stack)"),
        1 => children[0].name.clone(),
        _ => {
            let options: Vec<String> = children.into_iter().map(|child| child.name).collect();
            let index = StdinPrompter
                .select(&format!("Multiple children found for {current}:"), &options)?;
            options[index].clone()
        }
    };

    git.checkout(&target)?;
    output::success(&format!("Switched to child branch: {target}"));
    Ok(())
}
