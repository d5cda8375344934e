//! `cairn reparent` - change the parent of the current branch.
//!
//! Also useful for adding an existing branch to a stack: reparenting a
//! branch with no recorded parent simply records one.

use anyhow::Result;
use cairn_core::Error as CoreError;
use cairn_core::store::StackStore;
use cairn_git::GitOps;
use cairn_github::GitHubApi;

use crate::commands::utils;
use crate::output;

/// Run the reparent command.
pub fn run(new_parent: &str, dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let github = utils::github_client(&git, dry_run, verbose);
    let store = StackStore::new(&git);

    let current = git.current_branch()?;
    let current_parent = store.parent_of(&current);

    if current_parent.as_deref() == Some(new_parent) {
        println!("Branch {current} is already parented to {new_parent}");
        return Ok(());
    }
    if !git.branch_exists(new_parent) {
        return Err(CoreError::BranchNotFound(new_parent.to_string()).into());
    }
    if new_parent == current {
        return Err(CoreError::SelfParent.into());
    }
    if store.is_descendant(&current, new_parent)? {
        return Err(CoreError::WouldCreateCycle {
            branch: current,
            parent: new_parent.to_string(),
        }
        .into());
    }

    match &current_parent {
        None => println!("Adding {current} to stack with parent {new_parent}"),
        Some(old) => println!("Reparenting {current}: {old} -> {new_parent}"),
    }

    store.set_parent(&current, new_parent)?;
    output::success(&format!("Updated parent to {new_parent}"));

    // The edge is already written; a PR-base failure past this point is
    // reported but does not undo it.
    match github.pr_for_branch(&current) {
        Ok(Some(pr)) if pr.base != new_parent => {
            println!(
                "Updating PR #{} base: {} -> {new_parent}",
                pr.number, pr.base
            );
            match github.update_pr_base(pr.number, new_parent) {
                Ok(()) => {
                    output::success(&format!("Updated PR #{} base to {new_parent}", pr.number));
                }
                Err(e) => output::warn(&format!("failed to update PR base: {e}")),
            }
        }
        Ok(Some(pr)) => println!("PR #{} base is already {new_parent}", pr.number),
        Ok(None) => println!("  (no PR found for this branch)"),
        Err(e) => output::warn(&format!("failed to check for PR: {e}")),
    }

    Ok(())
}
