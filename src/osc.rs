//! OSC (Operating System Command) query handling for terminal communication.
//!
//! This module provides functions for:
//! - Sending OSC 10/11 queries for the default foreground/background color
//! - Reading the terminal's reply up to its string terminator
//! - Matching the reply against the expected grammar
//!
//! Exactly one write and one accumulating read happen per query; retries are
//! left to the caller.

use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use crate::error::QueryError;
use crate::logs::{debug, warn};
use crate::terminal::{RawModeGuard, Terminal};

/// How long to wait for a reply unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// String Terminator.
const ST: &[u8] = b"\x1b\\";

/// Bell, accepted by most terminals in place of ST.
const BEL: &[u8] = b"\x07";

/// `ESC ] <code> ; <payload> (ST | BEL)`, anchored on both ends.
static REPLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x1b\](\d+);(.+)(?:\x1b\\|\x07)$").expect("reply pattern is valid")
});

/// The color queries the terminal is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscQuery {
    /// OSC 10, default foreground color.
    Foreground,
    /// OSC 11, default background color.
    Background,
}

impl OscQuery {
    /// The OSC code of this query.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Foreground => 10,
            Self::Background => 11,
        }
    }

    /// The escape sequence sent to the terminal: `ESC ] <code> ; ? ESC \`.
    #[must_use]
    pub fn request(self) -> Vec<u8> {
        format!("\x1b]{};?\x1b\\", self.code()).into_bytes()
    }
}

/// Settings for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Give up on the reply after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Restore the terminal if the process is interrupted mid-query.
    pub restore_on_interrupt: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            restore_on_interrupt: true,
        }
    }
}

/// Sends an OSC query to the terminal.
///
/// # Errors
///
/// Returns [`QueryError::Io`] if writing or flushing fails.
pub fn send_osc_query<T: Terminal>(terminal: &mut T, query: OscQuery) -> Result<(), QueryError> {
    terminal.send(&query.request())?;
    Ok(())
}

/// Reads the terminal's reply one byte at a time until it ends with ST or BEL.
///
/// # Arguments
///
/// - `terminal` - The device, already in cbreak mode
/// - `timeout` - Deadline for the complete reply, `None` to wait forever
///
/// # Errors
///
/// - [`QueryError::Timeout`] if the terminator does not arrive in time
/// - [`QueryError::Io`] if reading fails or input ends
pub fn read_terminal_response<T: Terminal>(
    terminal: &mut T,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, QueryError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut buf = Vec::new();

    while !(buf.ends_with(ST) || buf.ends_with(BEL)) {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        match terminal.read_byte(remaining)? {
            Some(byte) => buf.push(byte),
            None => {
                debug(&format!("timed out, partial={buf:?}"));
                return Err(QueryError::Timeout(timeout.unwrap_or_default()));
            }
        }
    }

    Ok(buf)
}

/// Extracts the payload from a complete reply.
///
/// Invalid UTF-8 is replaced rather than rejected, since terminals are
/// untrusted input.
///
/// # Errors
///
/// Returns [`QueryError::MalformedReply`] with the decoded text if the reply
/// is not `ESC ] <code> ; <payload> (ST | BEL)` for this query's code.
pub fn parse_osc_response(query: OscQuery, buf: &[u8]) -> Result<String, QueryError> {
    let response = String::from_utf8_lossy(buf);
    debug(&format!("response={response:?}"));

    REPLY_RE
        .captures(&response)
        .filter(|caps| &caps[1] == query.code().to_string())
        .map(|caps| caps[2].to_string())
        .ok_or_else(|| QueryError::MalformedReply(response.into_owned()))
}

/// Perform one OSC color query and return the reply's payload.
///
/// The terminal is held in cbreak/no-echo mode only while the query is
/// written and the reply read, and is restored before the reply is parsed,
/// whichever way the exchange ends.
///
/// # Errors
///
/// - [`QueryError::NotATerminal`] if either stream is not a terminal; the
///   device is not touched
/// - [`QueryError::Timeout`], [`QueryError::Io`] if the exchange fails
/// - [`QueryError::MalformedReply`] if the reply does not match
/// - [`QueryError::Restore`] if the exchange succeeded but the original
///   attributes could not be reapplied
pub fn query<T: Terminal>(
    terminal: &mut T,
    query: OscQuery,
    config: &QueryConfig,
) -> Result<String, QueryError> {
    if !(terminal.input_is_tty() && terminal.output_is_tty()) {
        return Err(QueryError::NotATerminal);
    }

    let mut guard = RawModeGuard::acquire(terminal)?;
    let exchange = send_osc_query(&mut *guard, query)
        .and_then(|()| read_terminal_response(&mut *guard, config.timeout));
    let released = guard.release();

    let buf = match (exchange, released) {
        (Ok(buf), Ok(())) => buf,
        (Ok(_), Err(restore)) => return Err(restore),
        (Err(e), Ok(())) => return Err(e),
        (Err(e), Err(restore)) => {
            warn(&restore.to_string());
            return Err(e);
        }
    };

    parse_osc_response(query, &buf)
}
