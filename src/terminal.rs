//! Terminal device operations and low-level terminal control.
//!
//! This module provides:
//! - The [`Terminal`] trait, the device seam the query engine talks to
//! - [`StdTerminal`], the implementation over standard input and output
//! - [`RawModeGuard`], which switches the device to cbreak/no-echo mode and
//!   restores the original attributes when it goes out of scope

use std::fmt;
use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::ops::{Deref, DerefMut};
use std::os::fd::AsFd;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use termios::{ECHO, ICANON, TCSANOW, Termios, VMIN, VTIME, tcsetattr};

use crate::error::QueryError;
use crate::interrupt;
use crate::logs::{debug, warn};

/// File descriptor of standard input, whose attributes the guard changes.
const STDIN_FD: i32 = 0;

/// Serializes raw-mode acquisitions across the process.
static RAW_MODE_LOCK: Mutex<()> = Mutex::new(());

/// A terminal device that can be queried with escape sequences.
///
/// The query engine only needs attribute introspection and mutation,
/// single-byte reads and flushed writes. Implementations other than
/// [`StdTerminal`] exist mainly to exercise the engine without a real tty.
pub trait Terminal {
    /// Snapshot of the device's line-discipline attributes.
    type Mode: Clone + fmt::Debug;

    /// Whether the input stream is attached to an interactive terminal.
    fn input_is_tty(&self) -> bool;

    /// Whether the output stream is attached to an interactive terminal.
    fn output_is_tty(&self) -> bool;

    /// Read the current attributes of the input stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be read.
    fn mode(&self) -> io::Result<Self::Mode>;

    /// Apply `mode` to the input stream immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the attributes cannot be set.
    fn set_mode(&mut self, mode: &Self::Mode) -> io::Result<()>;

    /// Derive the cbreak/no-echo variant of `mode`: canonical input and echo
    /// disabled, one byte per read, no inter-byte timeout.
    fn cbreak_noecho(mode: &Self::Mode) -> Self::Mode;

    /// Write `bytes` to the output stream and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read one byte from the input stream.
    ///
    /// With `Some(timeout)`, returns `Ok(None)` when no byte arrives in time.
    /// With `None`, blocks until a byte arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the input reached end of file.
    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>>;

    /// Remember `original` so it is reapplied if the process is interrupted
    /// while raw mode is active. Called before raw mode is applied.
    fn arm_interrupt_restore(&mut self, _original: &Self::Mode) {}

    /// Forget the mode registered by [`Terminal::arm_interrupt_restore`].
    fn disarm_interrupt_restore(&mut self) {}
}

/// RAII guard holding the terminal in cbreak/no-echo mode.
///
/// The original attributes are reapplied exactly once: by
/// [`RawModeGuard::release`], or by `Drop` if the guard is dropped on an
/// error path. Only one guard can be active in the process at a time; a
/// second acquisition blocks until the first guard is gone.
pub struct RawModeGuard<'a, T: Terminal> {
    terminal: &'a mut T,
    original: Option<T::Mode>,
    _exclusive: MutexGuard<'static, ()>,
}

impl<'a, T: Terminal> RawModeGuard<'a, T> {
    /// Switch `terminal` to cbreak/no-echo mode.
    ///
    /// # Errors
    ///
    /// - [`QueryError::NotATerminal`] if the input stream is not an
    ///   interactive terminal; nothing is changed in that case
    /// - [`QueryError::Io`] if the new attributes cannot be applied
    pub fn acquire(terminal: &'a mut T) -> Result<Self, QueryError> {
        if !terminal.input_is_tty() {
            return Err(QueryError::NotATerminal);
        }

        let exclusive = RAW_MODE_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let original = terminal.mode().map_err(|e| {
            debug(&format!("cannot read terminal attributes: {e}"));
            QueryError::NotATerminal
        })?;
        let raw = T::cbreak_noecho(&original);
        terminal.arm_interrupt_restore(&original);
        if let Err(e) = terminal.set_mode(&raw) {
            terminal.disarm_interrupt_restore();
            return Err(e.into());
        }
        debug(&format!("raw mode on, saved={original:?}"));

        Ok(Self {
            terminal,
            original: Some(original),
            _exclusive: exclusive,
        })
    }

    /// Reapply the original attributes and consume the guard.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Restore`] if the attributes cannot be reapplied.
    pub fn release(mut self) -> Result<(), QueryError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), QueryError> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        self.terminal.disarm_interrupt_restore();
        debug("raw mode off");
        self.terminal
            .set_mode(&original)
            .map_err(QueryError::Restore)
    }
}

impl<T: Terminal> Deref for RawModeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.terminal
    }
}

impl<T: Terminal> DerefMut for RawModeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.terminal
    }
}

impl<T: Terminal> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn(&e.to_string());
        }
    }
}

/// The process's standard input and output.
///
/// Attributes are read from and applied to standard input; queries are
/// written to standard output.
#[derive(Debug)]
pub struct StdTerminal {
    restore_on_interrupt: bool,
    input: Option<File>,
}

impl StdTerminal {
    /// Create a handle on the standard streams with the interrupt fallback
    /// enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interrupt_restore(true)
    }

    /// Create a handle on the standard streams.
    ///
    /// When `restore_on_interrupt` is set, a SIGINT, SIGTERM or SIGHUP
    /// received while raw mode is active restores the original attributes
    /// before the process terminates.
    #[must_use]
    pub fn with_interrupt_restore(restore_on_interrupt: bool) -> Self {
        Self {
            restore_on_interrupt,
            input: None,
        }
    }

    /// Unbuffered handle on standard input.
    ///
    /// `io::Stdin` buffers internally, which would hide pending bytes from
    /// `poll`, so reads go through a duplicate of the descriptor instead.
    fn input(&mut self) -> io::Result<&mut File> {
        if self.input.is_none() {
            let fd = io::stdin().as_fd().try_clone_to_owned()?;
            self.input = Some(File::from(fd));
        }
        self.input
            .as_mut()
            .ok_or_else(|| io::Error::other("standard input unavailable"))
    }
}

impl Default for StdTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for StdTerminal {
    type Mode = Termios;

    fn input_is_tty(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn output_is_tty(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn mode(&self) -> io::Result<Termios> {
        Termios::from_fd(STDIN_FD)
    }

    fn set_mode(&mut self, mode: &Termios) -> io::Result<()> {
        tcsetattr(STDIN_FD, TCSANOW, mode)
    }

    fn cbreak_noecho(mode: &Termios) -> Termios {
        let mut raw = *mode;
        raw.c_lflag &= !(ICANON | ECHO);
        raw.c_cc[VMIN] = 1;
        raw.c_cc[VTIME] = 0;
        raw
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        read_one(self.input()?, timeout)
    }

    fn arm_interrupt_restore(&mut self, original: &Termios) {
        if self.restore_on_interrupt {
            interrupt::arm(*original);
        }
    }

    fn disarm_interrupt_restore(&mut self) {
        if self.restore_on_interrupt {
            interrupt::disarm();
        }
    }
}

/// Read a single byte from `input`, waiting at most `timeout` if given.
fn read_one<R: Read + AsFd>(input: &mut R, timeout: Option<Duration>) -> io::Result<Option<u8>> {
    if let Some(timeout) = timeout {
        if !wait_readable(&*input, timeout)? {
            return Ok(None);
        }
    }

    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Poll `fd` until it has data or `timeout` elapses.
///
/// Returns `Ok(true)` when a read will not block.
fn wait_readable<F: AsFd>(fd: F, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        // poll takes at most u16::MAX milliseconds per call here; longer
        // timeouts loop.
        let slice = u16::try_from(remaining.as_millis()).unwrap_or(u16::MAX);
        let pollfd = PollFd::new(fd.as_fd(), PollFlags::POLLIN);

        match poll(&mut [pollfd], PollTimeout::from(slice)) {
            Ok(0) => {
                if remaining.is_zero() || Instant::now() >= deadline {
                    return Ok(false);
                }
            }
            Ok(_) => return Ok(true),
            Err(Errno::EINTR) => {}
            Err(e) => return Err(e.into()),
        }
    }
}
