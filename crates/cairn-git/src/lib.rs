//! # cairn-git
//!
//! Git operations abstraction layer for cairn. All operations are
//! blocking invocations of the `git` binary; the [`GitClient`]
//! implementation centralises dry-run suppression and verbose command
//! tracing, and the [`GitOps`] trait allows tests to substitute
//! in-memory implementations.

mod client;
mod error;
mod traits;

pub use client::GitClient;
pub use error::{Error, Result};
pub use traits::GitOps;
