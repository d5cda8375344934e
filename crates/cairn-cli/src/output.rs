//! Terminal output formatting utilities.

use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message.
pub fn warn(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", "→".blue(), msg);
}

/// A branch name, coloured.
#[must_use]
pub fn branch(name: &str) -> String {
    name.cyan().to_string()
}

/// Marker appended to the current branch in tree views.
#[must_use]
pub fn current_marker() -> String {
    " *".cyan().bold().to_string()
}

/// Dim parenthetical text.
#[must_use]
pub fn dim(text: &str) -> String {
    text.dimmed().to_string()
}
