//! Shared helpers for command modules.

use anyhow::{Context, Result};
use cairn_git::{GitClient, GitOps};
use cairn_github::{GhClient, parse_repo_from_url};

/// Fail early when not inside a git repository.
pub fn ensure_in_repository() -> Result<()> {
    GitClient::new(false, false)
        .repo_root()
        .map(|_| ())
        .context("not in a git repository")
}

/// Build the git port with the global flags applied.
#[must_use]
pub fn git_client(dry_run: bool, verbose: bool) -> GitClient {
    GitClient::new(dry_run, verbose)
}

/// Build the review-service port, addressing the repository parsed from
/// the origin URL.
#[must_use]
pub fn github_client(git: &GitClient, dry_run: bool, verbose: bool) -> GhClient {
    let repo = parse_repo_from_url(&git.remote_url("origin"));
    GhClient::new(repo, dry_run, verbose)
}
