//! Error types for cairn-core.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Branch not found.
    #[error("branch {0} does not exist")]
    BranchNotFound(String),

    /// A branch with this name already exists.
    #[error("branch {0} already exists")]
    BranchExists(String),

    /// Branch is not part of any stack.
    #[error("branch {0} is not part of a stack (no stackparent configured)")]
    NotInStack(String),

    /// Circular parent edges discovered during a walk.
    #[error("circular dependency detected in stack at {0}")]
    CircularDependency(String),

    /// A reparent would introduce a cycle.
    #[error("cannot reparent to {parent}: it is a descendant of {branch} (would create a cycle)")]
    WouldCreateCycle {
        /// The branch being reparented.
        branch: String,
        /// The requested parent.
        parent: String,
    },

    /// A branch cannot be its own parent.
    #[error("cannot set branch as its own parent")]
    SelfParent,

    /// The working tree has uncommitted changes.
    #[error("working tree has uncommitted changes; commit or stash them first")]
    DirtyWorkingTree,

    /// `sync --resume` without an interrupted sync.
    #[error("no interrupted sync to resume\n\nUse 'cairn sync' to start a new sync")]
    NothingToResume,

    /// `sync --abort` without an interrupted sync.
    #[error("no interrupted sync to abort\n\nUse 'cairn sync' to start a new sync")]
    NothingToAbort,

    /// A selection prompt received something out of range.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A branch in the current stack is checked out elsewhere.
    #[error(
        "cannot sync: branch '{branch}' is checked out in worktree at {path}\n\n\
         To sync this stack:\n  1. cd {path}\n  2. cairn sync\n\n\
         Or remove the worktree: git worktree remove {path}"
    )]
    WorktreeConflict {
        /// The branch checked out elsewhere.
        branch: String,
        /// Canonical path of the other worktree.
        path: String,
    },

    /// The branch carries far more commits than distinct patches.
    #[error("branch history is polluted, manual cleanup recommended")]
    PollutedHistory {
        /// Commits on the branch since the merge-base.
        total_commits: usize,
        /// Of those, how many are patch-unique.
        unique_patches: usize,
    },

    /// A rebase stopped on conflicts. The resume and abort recipes were
    /// already printed, so the top-level handler suppresses this message.
    #[error("rebase stopped on conflicts")]
    RebaseConflict,

    /// A push was rejected.
    #[error("push failed for {branch}: {source}")]
    PushFailed {
        /// The branch whose push failed.
        branch: String,
        /// The underlying git error.
        source: cairn_git::Error,
    },

    /// Reading an interactive answer failed.
    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] cairn_git::Error),

    /// Review service error.
    #[error("github error: {0}")]
    GitHub(#[from] cairn_github::Error),
}
