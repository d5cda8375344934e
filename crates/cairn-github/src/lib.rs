//! # cairn-github
//!
//! GitHub pull request integration for cairn. All queries and mutations
//! go through the `gh` CLI as blocking child processes; `gh` also owns
//! authentication, so no tokens ever pass through this crate. The
//! [`GitHubApi`] trait allows tests to substitute canned responses.

mod client;
mod error;
mod traits;
mod types;

pub use client::{GhClient, parse_repo_from_url};
pub use error::{Error, Result};
pub use traits::GitHubApi;
pub use types::{PrState, PullRequest};
