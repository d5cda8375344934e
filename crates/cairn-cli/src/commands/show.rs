//! `cairn show` - print the local stack structure, no network.

use anyhow::Result;
use cairn_core::graph::{self, TreeNode};
use cairn_core::store::StackStore;
use cairn_git::{GitClient, GitOps};

use crate::commands::utils;
use crate::output;

/// Run the show command.
pub fn run(dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let store = StackStore::new(&git);
    let current = git.current_branch()?;

    if store.all_branches()?.is_empty() {
        println!("No stack branches found.");
        println!("Current branch: {}", output::branch(&current));
        println!();
        println!("Use 'cairn create <branch-name>' to start a stack.");
        return Ok(());
    }

    println!();
    print_current_stack(&git, &current)?;
    Ok(())
}

/// Print the stack containing `current` as a vertical tree. Shared with
/// `create` and `rename`, which show the stack after mutating it.
pub fn print_current_stack(git: &GitClient, current: &str) -> Result<()> {
    let store = StackStore::new(git);
    let chain = store.chain_to(current)?;
    let branches = store.all_branches()?;
    let base = store.base_branch();

    match graph::build_tree(&base, &chain, &branches) {
        Some(tree) => print_tree(&tree, current, false),
        None => println!(
            " {} {}",
            output::branch(current),
            output::dim("(not in a stack)")
        ),
    }
    Ok(())
}

fn print_tree(node: &TreeNode, current: &str, piped: bool) {
    if piped {
        println!("  |");
    }
    let marker = if node.name == current {
        output::current_marker()
    } else {
        String::new()
    };
    println!(" {}{marker}", output::branch(&node.name));

    for child in &node.children {
        print_tree(child, current, true);
    }
}
