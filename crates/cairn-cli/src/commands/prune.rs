//! `cairn prune` - delete local branches whose PRs have merged.

use std::collections::HashMap;
use std::thread;

use anyhow::Result;
use cairn_core::store::StackStore;
use cairn_core::sync::PrCache;
use cairn_git::GitOps;
use cairn_github::{GitHubApi, PrState, PullRequest};

use crate::commands::utils;
use crate::output;

/// Run the prune command.
pub fn run(all: bool, force: bool, dry_run: bool, verbose: bool) -> Result<()> {
    let git = utils::git_client(dry_run, verbose);
    let github = utils::github_client(&git, dry_run, verbose);
    let store = StackStore::new(&git);

    let current = git.current_branch()?;
    let base = store.base_branch();

    // The PR listing is the slow call; collect candidates while it runs.
    let mut prs_result: cairn_github::Result<HashMap<String, PullRequest>> = Ok(HashMap::new());
    let candidates: Result<Vec<String>> = thread::scope(|scope| {
        scope.spawn(|| prs_result = github.all_open_prs());
        if all {
            Ok(git
                .list_branches()?
                .into_iter()
                .filter(|branch| *branch != base && *branch != current)
                .collect())
        } else {
            Ok(store
                .all_branches()?
                .into_iter()
                .map(|branch| branch.name)
                .collect())
        }
    });
    let candidates = candidates?;

    if candidates.is_empty() {
        if all {
            println!("No branches found to check.");
        } else {
            println!("No stack branches found.");
        }
        return Ok(());
    }

    // Merged PRs are absent from the open-only bulk map; the cache falls
    // back to per-branch lookups to find them.
    let prs = PrCache::new(&github, prs_result.unwrap_or_default());
    let merged: Vec<(String, u64)> = candidates
        .iter()
        .filter_map(|branch| {
            prs.lookup(branch)
                .filter(|pr| pr.state == PrState::Merged)
                .map(|pr| (branch.clone(), pr.number))
        })
        .collect();

    if merged.is_empty() {
        println!();
        println!("No merged branches to prune.");
        return Ok(());
    }

    println!();
    println!("Found {} merged branch(es) to prune:", merged.len());
    for (branch, number) in &merged {
        println!("  - {branch} (PR #{number})");
    }
    println!();

    if dry_run {
        println!("Dry run - no changes made.");
        return Ok(());
    }

    for (index, (branch, _)) in merged.iter().enumerate() {
        println!("({}/{}) Pruning {branch}...", index + 1, merged.len());

        if store.parent_of(branch).is_some() {
            println!("  Removing from stack tracking...");
            if let Err(e) = store.unset_parent(branch) {
                output::warn(&format!("failed to remove stack config: {e}"));
            }
        }

        if *branch == current {
            println!("  Skipping deletion (currently checked out)");
            println!();
            continue;
        }

        println!("  Deleting branch...");
        let deleted = if force {
            git.delete_branch_force(branch)
        } else {
            git.delete_branch(branch)
        };
        match deleted {
            Ok(()) => output::success("Deleted"),
            Err(e) => {
                output::warn(&format!("failed to delete branch: {e}"));
                if !force {
                    println!(
                        "  Use 'cairn prune --force' to force delete, or delete manually with: git branch -D {branch}"
                    );
                }
            }
        }
        println!();
    }

    output::success("Prune complete!");
    Ok(())
}
