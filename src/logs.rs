//! Logging and debug utilities.
//!
//! Debug output is opt-in through the `DEBUG` environment variable; warnings
//! about terminal state are always written to stderr.

use std::env;

/// Print debug messages to stderr if DEBUG environment variable is set.
///
/// # Arguments
///
/// * `message` - The debug message to print
pub fn debug(message: &str) {
    if env::var("DEBUG").is_ok() {
        eprintln!("{message}");
    }
}

/// Print a warning to stderr regardless of the DEBUG setting.
///
/// Used for conditions the user has to know about, such as a terminal that
/// could not be switched back out of raw mode.
///
/// # Arguments
///
/// * `message` - The warning to print
pub fn warn(message: &str) {
    eprintln!("sixelmath: warning: {message}");
}
