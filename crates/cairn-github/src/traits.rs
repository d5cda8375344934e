//! Trait abstraction for review-service operations.

use std::collections::HashMap;

use crate::Result;
use crate::types::PullRequest;

/// Trait for pull request queries and mutations.
///
/// The concrete implementation is [`crate::GhClient`], which invokes the
/// `gh` CLI; tests substitute canned maps.
#[allow(clippy::missing_errors_doc)]
pub trait GitHubApi {
    /// Look up the effective PR for a branch, if any.
    fn pr_for_branch(&self, branch: &str) -> Result<Option<PullRequest>>;

    /// Fetch every open PR in one call, keyed by head branch name.
    ///
    /// Only open records are returned; large repositories make an
    /// all-states listing time out. Merged and closed PRs are found with
    /// [`Self::pr_for_branch`].
    fn all_open_prs(&self) -> Result<HashMap<String, PullRequest>>;

    /// Change the recorded base branch of a PR.
    fn update_pr_base(&self, number: u64, new_base: &str) -> Result<()>;
}
