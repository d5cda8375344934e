//! `cairn rename` - rename the current branch, keeping the stack intact.

use anyhow::Result;
use cairn_core::Error as CoreError;
use cairn_core::store::StackStore;
use cairn_git::GitOps;

use crate::commands::{show, utils};
use crate::output;

/// Run the rename command. Must be run on the branch being renamed.
pub fn run(new_name: &str, dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let store = StackStore::new(&git);

    let old_name = git.current_branch()?;
    let Some(old_parent) = store.parent_of(&old_name) else {
        return Err(CoreError::NotInStack(old_name).into());
    };
    if git.branch_exists(new_name) {
        return Err(CoreError::BranchExists(new_name.to_string()).into());
    }

    let children = store.children_of(&old_name)?;

    println!("Renaming branch {old_name} -> {new_name}");
    if !children.is_empty() {
        println!("  Will update {} child branch(es)", children.len());
    }

    git.rename_branch(&old_name, new_name)?;

    // git branch -m migrates the branch.<old>.* config section, so the
    // edge usually moved already; writing it again is harmless and
    // covers older gits.
    store.set_parent(new_name, &old_parent)?;
    if let Err(e) = store.unset_parent(&old_name)
        && verbose
    {
        println!("  Note: old parent config already removed: {e}");
    }

    for child in &children {
        store.set_parent(&child.name, new_name)?;
        output::success(&format!("Updated child {} to point to {new_name}", child.name));
    }

    output::success(&format!("Renamed branch {old_name} -> {new_name}"));

    if !dry_run {
        println!();
        if let Err(e) = show::print_current_stack(&git, new_name) {
            output::warn(&format!("failed to display stack: {e}"));
        }
    }

    Ok(())
}
