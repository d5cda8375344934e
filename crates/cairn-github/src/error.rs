//! Error types for cairn-github.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the review service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A gh command exited with a non-zero status.
    #[error("gh {command} failed: {stderr}")]
    Command {
        /// The arguments the command was invoked with.
        command: String,
        /// Captured stderr of the failed command.
        stderr: String,
    },

    /// The gh binary could not be spawned at all.
    #[error("failed to run gh: {0}")]
    Spawn(#[from] std::io::Error),

    /// gh produced JSON we could not decode.
    #[error("failed to parse gh output: {0}")]
    Parse(#[from] serde_json::Error),
}
