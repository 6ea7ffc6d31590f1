//! Error types for the terminal color query.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single OSC color query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Standard input or standard output is not an interactive terminal.
    #[error("not connected to a terminal")]
    NotATerminal,

    /// The terminal answered, but not with `ESC ] <code> ; <payload> ST`.
    #[error("malformed reply from terminal: {0:?}")]
    MalformedReply(String),

    /// No terminator arrived before the deadline.
    #[error("terminal did not reply within {0:?}")]
    Timeout(Duration),

    /// Writing the query or reading the reply failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The original terminal attributes could not be reapplied.
    #[error("failed to restore terminal attributes: {0}")]
    Restore(#[source] io::Error),
}

impl QueryError {
    /// Whether the failure only means "color unknown".
    ///
    /// Everything except [`QueryError::Restore`] is recoverable: the terminal
    /// is back in its original mode and the caller can fall back to a
    /// default color.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Restore(_))
    }
}
