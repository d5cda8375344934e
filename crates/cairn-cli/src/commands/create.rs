//! `cairn create` - create a new branch in the stack.

use anyhow::Result;
use cairn_core::Error as CoreError;
use cairn_core::store::StackStore;
use cairn_git::GitOps;

use crate::commands::{show, utils};
use crate::output;

/// Run the create command. Name validity is git's call: an invalid ref
/// name surfaces as the checkout failure, stderr included.
pub fn run(name: &str, parent: Option<&str>, dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);

    if !git.is_working_tree_clean()? {
        return Err(CoreError::DirtyWorkingTree.into());
    }
    if git.branch_exists(name) {
        return Err(CoreError::BranchExists(name.to_string()).into());
    }

    let parent = match parent {
        Some(explicit) => {
            if !git.branch_exists(explicit) {
                return Err(CoreError::BranchNotFound(explicit.to_string()).into());
            }
            explicit.to_string()
        }
        None => git.current_branch()?,
    };

    println!("Creating new branch {name} from {parent}");
    git.create_branch(name, &parent)?;

    let store = StackStore::new(&git);
    store.set_parent(name, &parent)?;

    if !dry_run {
        output::success(&format!("Created branch {name} with parent {parent}"));
        println!();
        if let Err(e) = show::print_current_stack(&git, name) {
            output::warn(&format!("failed to display stack: {e}"));
        }
    }

    Ok(())
}
