//! Error types for cairn-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
///
/// Command failures carry the captured stderr of the underlying `git`
/// invocation so the message shown to the user is the message git wrote.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A git command exited with a non-zero status.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The arguments the command was invoked with.
        command: String,
        /// Captured stderr of the failed command.
        stderr: String,
    },

    /// The git binary could not be spawned at all.
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}
