//! Stdin-backed implementation of the core [`Prompter`] trait.

use std::io::{self, Write};

use cairn_core::prompt::Prompter;
use cairn_core::{Error, Result};

/// Prompter reading answers from standard input.
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line() -> Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input).map_err(Error::Input)?;
        Ok(input.trim().to_string())
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        print!("{question} [Y/n] ");
        io::stdout().flush().map_err(Error::Input)?;

        let answer = Self::read_line()?.to_lowercase();
        Ok(answer.is_empty() || answer == "y" || answer == "yes")
    }

    fn select(&self, question: &str, options: &[String]) -> Result<usize> {
        println!("{question}");
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {}", index + 1, option);
        }
        print!("\nSelect branch (1-{}): ", options.len());
        io::stdout().flush().map_err(Error::Input)?;

        let answer = Self::read_line()?;
        let choice: usize = answer
            .parse()
            .map_err(|_| Error::InvalidSelection(answer.clone()))?;
        if choice < 1 || choice > options.len() {
            return Err(Error::InvalidSelection(answer));
        }
        Ok(choice - 1)
    }
}
