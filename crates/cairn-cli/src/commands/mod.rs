//! CLI surface: argument parsing and one module per subcommand.

use clap::{Parser, Subcommand};

pub mod create;
pub mod navigate;
pub mod parent;
pub mod prune;
pub mod rename;
pub mod reparent;
pub mod show;
pub mod sync;
pub mod utils;

/// Manage stacked branches and sync them to GitHub PRs.
///
/// Stack branches are tracked in git config, where each branch records
/// its parent. cairn helps you create, navigate, and sync stacked
/// branches with minimal overhead.
#[derive(Debug, Parser)]
#[command(name = "cairn", version, about, long_about = None)]
pub struct Cli {
    /// Show what would happen without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Show the underlying git/gh commands
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new branch in the stack
    ///
    /// The branch is created from PARENT (default: the current branch)
    /// and the parent relationship is recorded in git config.
    Create {
        /// Name of the new branch
        name: String,
        /// Parent branch (defaults to the current branch)
        parent: Option<String>,
    },

    /// Sync all stack branches with their parents and update PRs
    ///
    /// Fetches origin, rebases every branch of the current stack onto
    /// its parent in bottom-to-top order, force-pushes each branch with
    /// a lease, and points each PR at its stack parent. Branches whose
    /// PRs merged are dropped from tracking, and children of a merged
    /// parent are rebased onto the merged parent's parent.
    Sync {
        /// Use --force instead of --force-with-lease for pushes
        #[arg(short, long)]
        force: bool,
        /// Resume a sync after resolving rebase conflicts
        #[arg(short, long)]
        resume: bool,
        /// Abort an interrupted sync and clean up state
        #[arg(short, long)]
        abort: bool,
    },

    /// Change the parent of the current branch
    Reparent {
        /// The new parent branch
        new_parent: String,
    },

    /// Rename the current branch, preserving stack relationships
    Rename {
        /// The new branch name
        new_name: String,
    },

    /// Show the parent of the current branch
    Parent,

    /// Check out the parent branch in the stack
    Up,

    /// Check out a child branch in the stack
    Down,

    /// Delete local branches whose PRs have merged
    Prune {
        /// Check all local branches, not just stack branches
        #[arg(short, long)]
        all: bool,
        /// Force delete branches even if they have unmerged commits
        #[arg(short, long)]
        force: bool,
    },

    /// Show the local stack structure (no network)
    Show,
}
