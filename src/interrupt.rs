//! Terminal restoration on interrupt.
//!
//! In cbreak mode the terminal still turns Ctrl-C into SIGINT, whose default
//! action would end the process before any `Drop` runs. While raw mode is
//! active a listener thread is registered for SIGINT, SIGTERM and SIGHUP; it
//! reapplies the armed attributes first, then performs the signal's default
//! action. Disarming closes the listener, so signal handling outside a query
//! is left to the host.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use signal_hook::low_level::emulate_default_handler;
use termios::{TCSANOW, Termios, tcsetattr};

use crate::logs::{debug, warn};

const STDIN_FD: i32 = 0;

const INTERRUPT_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Attributes to reapply if a signal arrives while raw mode is active.
static ARMED: Mutex<Option<Termios>> = Mutex::new(None);

/// The running listener, present only between [`arm`] and [`disarm`].
static LISTENER: Mutex<Option<Listener>> = Mutex::new(None);

fn armed() -> MutexGuard<'static, Option<Termios>> {
    ARMED.lock().unwrap_or_else(PoisonError::into_inner)
}

fn listener() -> MutexGuard<'static, Option<Listener>> {
    LISTENER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signal thread that restores the armed attributes.
struct Listener {
    handle: Handle,
    thread: JoinHandle<()>,
}

impl Listener {
    fn spawn() -> std::io::Result<Self> {
        let mut signals = Signals::new(INTERRUPT_SIGNALS)?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("sixelmath-interrupt".into())
            .spawn(move || {
                for signal in signals.forever() {
                    // Outside raw mode the signal belongs to the host
                    let Some(original) = armed().take() else {
                        continue;
                    };
                    if let Err(e) = tcsetattr(STDIN_FD, TCSANOW, &original) {
                        warn(&format!("failed to restore terminal attributes: {e}"));
                    }
                    if let Err(e) = emulate_default_handler(signal) {
                        warn(&format!("cannot deliver signal {signal}: {e}"));
                    }
                }
            })?;

        Ok(Self { handle, thread })
    }

    /// Unregister the signals and wait for the thread to finish.
    fn close(self) {
        self.handle.close();
        if self.thread.join().is_err() {
            debug("interrupt listener panicked");
        }
    }
}

/// Start the listener if it is not running.
///
/// If it cannot be started the query still runs, only without the fallback.
fn start_listener() {
    let mut listener = listener();
    if listener.is_none() {
        match Listener::spawn() {
            Ok(spawned) => *listener = Some(spawned),
            Err(e) => debug(&format!("interrupt restore unavailable: {e}")),
        }
    }
}

/// Register `original` to be restored if the process is interrupted.
///
/// Call before switching the terminal to raw mode, so there is no window in
/// which raw mode is active without the fallback.
pub fn arm(original: Termios) {
    *armed() = Some(original);
    start_listener();
}

/// Clear the attributes registered by [`arm`] and stop the listener.
pub fn disarm() {
    armed().take();
    if let Some(running) = listener().take() {
        running.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_hook::flag;
    use signal_hook::low_level::raise;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_disarm_without_arm_is_noop() {
        disarm();
        assert!(armed().is_none());
    }

    #[test]
    fn test_host_sigint_handler_survives_disarm() -> anyhow::Result<()> {
        let host_saw_sigint = Arc::new(AtomicBool::new(false));
        flag::register(SIGINT, Arc::clone(&host_saw_sigint))?;

        start_listener();
        disarm();
        assert!(listener().is_none());

        // With the listener gone the host's handler alone decides
        raise(SIGINT)?;
        assert!(host_saw_sigint.load(Ordering::SeqCst));
        Ok(())
    }
}
