//! Trait abstraction for git operations.
//!
//! This module defines the `GitOps` trait which abstracts git operations,
//! enabling dependency injection and testability. The concrete
//! implementation is [`crate::GitClient`], which shells out to `git`.

use std::collections::{HashMap, HashSet};

use crate::Result;

/// Trait for git repository operations.
///
/// All operations are synchronous: the real implementation blocks on a
/// `git` child process. Queries that answer "does X exist" return plain
/// bools; everything else that can fail returns a [`Result`] whose error
/// carries the tool's stderr.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Inspection ===

    /// Get the absolute path of the repository root.
    fn repo_root(&self) -> Result<String>;

    /// Get the name of the currently checked out branch.
    fn current_branch(&self) -> Result<String>;

    /// List all local branches.
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Check if a local branch exists.
    fn branch_exists(&self, name: &str) -> bool;

    /// Check if a branch exists on origin (via its remote-tracking ref).
    fn remote_branch_exists(&self, name: &str) -> bool;

    /// Get all remote-tracking branch names from origin in one call.
    fn remote_branches(&self) -> HashSet<String>;

    /// Get the commit hash of a ref.
    fn commit_hash(&self, reference: &str) -> Result<String>;

    /// Get the common ancestor of two refs.
    fn merge_base(&self, one: &str, two: &str) -> Result<String>;

    /// Check if the working tree has no uncommitted changes.
    fn is_working_tree_clean(&self) -> Result<bool>;

    /// Check if a rebase is in progress.
    fn is_rebase_in_progress(&self) -> bool;

    /// Check if a cherry-pick is in progress.
    fn is_cherry_pick_in_progress(&self) -> bool;

    /// Map each branch checked out in a worktree to that worktree's
    /// canonical (symlink-resolved) path.
    fn worktree_branches(&self) -> Result<HashMap<String, String>>;

    /// Get the canonical path of the worktree we are running in.
    fn current_worktree_path(&self) -> Result<String>;

    /// List the paths of all worktrees.
    fn list_worktrees(&self) -> Result<Vec<String>>;

    /// Get the URL of the named remote, or an empty string if unset.
    fn remote_url(&self, remote: &str) -> String;

    /// Detect the repository's default branch from the remote HEAD,
    /// falling back to common names.
    fn default_branch(&self) -> String;

    // === Config store ===

    /// Read a config value, or an empty string if unset.
    fn config(&self, key: &str) -> String;

    /// Write a config value.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a config value.
    fn unset_config(&self, key: &str) -> Result<()>;

    /// Read every recorded stack parent edge in one call, keyed by the
    /// child branch name.
    fn stack_parents(&self) -> Result<HashMap<String, String>>;

    // === Local ref mutation ===

    /// Create a new branch from the given ref and check it out.
    fn create_branch(&self, name: &str, from: &str) -> Result<()>;

    /// Check out a branch.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Rename a branch.
    fn rename_branch(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Delete a branch safely (fails on unmerged commits).
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Force delete a branch.
    fn delete_branch_force(&self, name: &str) -> Result<()>;

    /// Hard reset the working tree and current branch to a ref.
    fn reset_hard(&self, reference: &str) -> Result<()>;

    /// Hard reset the current branch to its remote copy.
    fn reset_to_remote(&self, branch: &str) -> Result<()>;

    /// Fetch from origin.
    fn fetch_all(&self) -> Result<()>;

    /// Fetch one branch from origin with an explicit refspec so its
    /// remote-tracking ref is created or updated.
    fn fetch_branch(&self, branch: &str) -> Result<()>;

    /// Rebase the current branch onto a ref.
    fn rebase(&self, onto: &str) -> Result<()>;

    /// `git rebase --onto new_base old_base branch`: replay the commits
    /// of `branch` since `old_base` on top of `new_base`.
    fn rebase_onto(&self, new_base: &str, old_base: &str, branch: &str) -> Result<()>;

    /// Abort an in-progress rebase.
    fn abort_rebase(&self) -> Result<()>;

    /// Abort an in-progress cherry-pick.
    fn abort_cherry_pick(&self) -> Result<()>;

    /// Cherry-pick a commit onto the current branch.
    fn cherry_pick(&self, commit: &str) -> Result<()>;

    /// Stash the working tree with a message.
    fn stash_push(&self, message: &str) -> Result<()>;

    /// Pop the most recent stash.
    fn stash_pop(&self) -> Result<()>;

    // === Push ===

    /// Push a branch to origin, optionally with `--force-with-lease`.
    fn push(&self, branch: &str, force_with_lease: bool) -> Result<()>;

    /// Push with `--force-with-lease=refs/heads/<branch>:<sha>`, naming
    /// the expected remote commit explicitly.
    fn push_with_expected_remote(&self, branch: &str, expected_remote_sha: &str) -> Result<()>;

    /// Unconditional force push, bypassing lease safety.
    fn force_push(&self, branch: &str) -> Result<()>;

    // === Worktrees ===

    /// Create a worktree at `path` for an existing local branch.
    fn add_worktree(&self, path: &str, branch: &str) -> Result<()>;

    /// Create a worktree at `path` with a new branch based on `base`.
    fn add_worktree_new_branch(&self, path: &str, new_branch: &str, base: &str) -> Result<()>;

    /// Create a worktree at `path` with a local branch tracking
    /// `origin/<branch>`.
    fn add_worktree_tracking(&self, path: &str, branch: &str) -> Result<()>;

    /// Remove the worktree at `path`.
    fn remove_worktree(&self, path: &str) -> Result<()>;

    // === Commit metrics ===

    /// Commits reachable from `branch` but not `base`, by SHA.
    fn commits_unique_by_sha(&self, base: &str, branch: &str) -> Result<Vec<String>>;

    /// Commits on `branch` whose patch does not appear on `base`,
    /// compared by patch-id so rebased or cherry-picked duplicates are
    /// recognised. Oldest first.
    fn commits_unique_by_patch(&self, base: &str, branch: &str) -> Result<Vec<String>>;
}
