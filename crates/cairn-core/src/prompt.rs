//! User-interaction boundary.
//!
//! The engine occasionally has to ask the user something (adopt a branch
//! into the stack, discard stale resume state). The trait keeps stdin
//! out of the core so tests can script the answers.

use crate::Result;

/// Asks the user questions on behalf of the engine.
pub trait Prompter {
    /// Ask a yes/no question; yes is the default answer.
    ///
    /// # Errors
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Ask the user to pick one of `options`; returns the chosen index.
    ///
    /// # Errors
    /// Returns an error if the answer cannot be read or is out of range.
    fn select(&self, question: &str, options: &[String]) -> Result<usize>;
}
