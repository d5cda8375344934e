//! Persistent record of an in-progress sync.
//!
//! Two config keys survive the process so a later `sync --resume` or
//! `sync --abort` knows what the interrupted run left behind. The keys
//! are written separately; a crash in between leaves a half-populated
//! record, so any subset of the keys present counts as "record exists"
//! and clearing always removes both.

use cairn_git::GitOps;

use crate::error::Result;

/// Key recording that the engine pushed a stash ("true" or absent).
pub const STASHED_KEY: &str = "stack.sync.stashed";

/// Key recording the branch the user was on when sync began.
pub const ORIGINAL_BRANCH_KEY: &str = "stack.sync.originalBranch";

/// State saved across process invocations while a sync is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeRecord {
    /// Whether the engine stashed uncommitted changes.
    pub stashed: bool,
    /// The branch to return to when the sync finishes or aborts.
    pub original_branch: Option<String>,
}

impl ResumeRecord {
    /// Read the record from the config store.
    pub fn read(git: &impl GitOps) -> Self {
        let stashed = git.config(STASHED_KEY) == "true";
        let original = git.config(ORIGINAL_BRANCH_KEY);
        Self {
            stashed,
            original_branch: if original.is_empty() {
                None
            } else {
                Some(original)
            },
        }
    }

    /// Whether an interrupted or in-progress sync left state behind.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.stashed || self.original_branch.is_some()
    }

    /// Start a record for a fresh sync.
    ///
    /// # Errors
    /// Returns the first failed config write; callers treat this as a
    /// warning since the only consequence is a less informed abort.
    pub fn begin(git: &impl GitOps, original_branch: &str, stashed: bool) -> Result<()> {
        git.set_config(ORIGINAL_BRANCH_KEY, original_branch)?;
        if stashed {
            git.set_config(STASHED_KEY, "true")?;
        }
        Ok(())
    }

    /// Record that a stash was pushed after the record began.
    ///
    /// # Errors
    /// Returns the failed config write; treated as a warning by callers.
    pub fn mark_stashed(git: &impl GitOps) -> Result<()> {
        Ok(git.set_config(STASHED_KEY, "true")?)
    }

    /// Remove the record. Idempotent: both keys are unset regardless of
    /// which were present, and failures are ignored.
    pub fn clear(git: &impl GitOps) {
        let _ = git.unset_config(STASHED_KEY);
        let _ = git.unset_config(ORIGINAL_BRANCH_KEY);
    }
}
