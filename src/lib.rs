//! Terminal color detection for sixel math rendering.
//!
//! Queries the terminal's default foreground (OSC 10) and background (OSC 11)
//! colors so rendered equations match the user's theme. A terminal that
//! cannot be queried simply yields no color; only a failure to put the
//! terminal back into its original mode is reported as an error.

pub mod color;
pub mod defaults;
pub mod error;
mod interrupt;
mod logs;
pub mod osc;
pub mod terminal;

use anyhow::{Context, Result};

pub use color::{RGB, parse_color};
pub use defaults::{Overrides, RenderDefaults};
pub use error::QueryError;
pub use osc::{OscQuery, QueryConfig};
pub use terminal::{RawModeGuard, StdTerminal, Terminal};

use logs::debug;

/// Query `terminal` for one of its default colors.
///
/// # Errors
///
/// Returns an error only if the terminal attributes could not be restored
/// after the query. Every other failure, such as no terminal, no reply, or
/// an unrecognized reply, yields `Ok(None)`.
pub fn get_default_color<T: Terminal>(
    terminal: &mut T,
    query: OscQuery,
    config: &QueryConfig,
) -> Result<Option<RGB>> {
    let payload = match osc::query(terminal, query, config) {
        Ok(payload) => payload,
        Err(e) if e.is_recoverable() => {
            debug(&format!("{query:?} color unknown: {e}"));
            return Ok(None);
        }
        Err(e) => return Err(e).context("Terminal left in raw mode after color query"),
    };
    debug(&format!("payload={payload:?}"));

    let rgb = parse_color(&payload);
    debug(&format!("rgb={rgb:?}"));

    Ok(rgb)
}

/// Query `terminal` for its default foreground color.
///
/// # Errors
///
/// See [`get_default_color`].
pub fn get_default_foreground<T: Terminal>(
    terminal: &mut T,
    config: &QueryConfig,
) -> Result<Option<RGB>> {
    get_default_color(terminal, OscQuery::Foreground, config)
}

/// Query `terminal` for its default background color.
///
/// # Errors
///
/// See [`get_default_color`].
pub fn get_default_background<T: Terminal>(
    terminal: &mut T,
    config: &QueryConfig,
) -> Result<Option<RGB>> {
    get_default_color(terminal, OscQuery::Background, config)
}

/// Default foreground color of the terminal on the standard streams.
///
/// # Errors
///
/// Returns an error if the terminal attributes could not be restored.
pub fn default_foreground() -> Result<Option<RGB>> {
    let config = QueryConfig::default();
    let mut terminal = StdTerminal::with_interrupt_restore(config.restore_on_interrupt);
    get_default_foreground(&mut terminal, &config)
}

/// Default background color of the terminal on the standard streams.
///
/// # Errors
///
/// Returns an error if the terminal attributes could not be restored.
pub fn default_background() -> Result<Option<RGB>> {
    let config = QueryConfig::default();
    let mut terminal = StdTerminal::with_interrupt_restore(config.restore_on_interrupt);
    get_default_background(&mut terminal, &config)
}

/// Resolve render defaults: built-in values, then terminal colors.
///
/// Both queries share `terminal` and run one after the other.
///
/// # Errors
///
/// Returns an error if the terminal attributes could not be restored.
pub fn detect_render_defaults<T: Terminal>(
    terminal: &mut T,
    config: &QueryConfig,
) -> Result<RenderDefaults> {
    let fg = get_default_foreground(terminal, config)?;
    let bg = get_default_background(terminal, config)?;
    Ok(RenderDefaults::default().with_terminal_colors(fg, bg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::mock::{MockMode, MockTerminal};
    use std::time::Duration;

    fn config() -> QueryConfig {
        QueryConfig {
            timeout: Some(Duration::from_millis(50)),
            restore_on_interrupt: false,
        }
    }

    #[test]
    fn test_foreground_st_reply() -> Result<()> {
        let mut term = MockTerminal::replying(b"\x1b]10;rgb:fcfc/fcfc/fcfc\x1b\\");
        let fg = get_default_foreground(&mut term, &config())?;
        assert_eq!(fg.map(RGB::to_hex).as_deref(), Some("#fcfcfc"));
        Ok(())
    }

    #[test]
    fn test_background_bel_reply() -> Result<()> {
        let mut term = MockTerminal::replying(b"\x1b]11;rgb:2323/2627/2727\x07");
        let bg = get_default_background(&mut term, &config())?;
        assert_eq!(bg.map(RGB::to_hex).as_deref(), Some("#232627"));
        Ok(())
    }

    #[test]
    fn test_malformed_reply_is_unknown() -> Result<()> {
        let mut term = MockTerminal::replying(b"\x1b]10;garbage\x1b\\");
        assert_eq!(get_default_foreground(&mut term, &config())?, None);

        let mut term = MockTerminal::replying(b"\x1b]11;rgb:2323/2627/2727\x07");
        // Reply for the other query
        assert_eq!(get_default_foreground(&mut term, &config())?, None);
        assert_eq!(term.mode, MockMode::COOKED);
        Ok(())
    }

    #[test]
    fn test_not_a_terminal_is_unknown() -> Result<()> {
        let mut term = MockTerminal::replying(b"\x1b]10;rgb:fcfc/fcfc/fcfc\x1b\\");
        term.output_tty = false;
        assert_eq!(get_default_foreground(&mut term, &config())?, None);
        assert_eq!(get_default_background(&mut term, &config())?, None);
        assert!(term.set_calls.is_empty());
        Ok(())
    }

    #[test]
    fn test_timeout_is_unknown_and_restores() -> Result<()> {
        let mut term = MockTerminal::replying(b"\x1b]11;rgb:2323");
        assert_eq!(get_default_background(&mut term, &config())?, None);
        assert_eq!(term.mode, MockMode::COOKED);
        assert_eq!(term.restore_count(), 1);
        Ok(())
    }

    #[test]
    fn test_restore_failure_is_an_error() {
        let mut term = MockTerminal::replying(b"\x1b]10;rgb:fcfc/fcfc/fcfc\x1b\\");
        term.fail_restore = true;

        let err = get_default_foreground(&mut term, &config()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::Restore(_))
        ));
    }

    #[test]
    fn test_detect_render_defaults() -> Result<()> {
        let mut term = MockTerminal::replying(
            b"\x1b]10;rgb:0000/0000/0000\x1b\\\x1b]11;rgb:ffff/ffff/ffff\x07",
        );
        let defaults = detect_render_defaults(&mut term, &config())?;

        assert_eq!(defaults.color, "#000000");
        assert_eq!(defaults.bgcolor, "#ffffff");
        assert_eq!(term.written, b"\x1b]10;?\x1b\\\x1b]11;?\x1b\\");
        assert_eq!(term.restore_count(), 2);
        Ok(())
    }

    #[test]
    fn test_std_streams_without_tty() -> Result<()> {
        use std::io::IsTerminal;

        // Only meaningful when the test runner is detached from a terminal
        if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
            return Ok(());
        }
        assert_eq!(default_foreground()?, None);
        assert_eq!(default_background()?, None);
        Ok(())
    }

    #[test]
    fn test_detect_render_defaults_falls_back() -> Result<()> {
        let mut term = MockTerminal::replying(b"");
        term.input_tty = false;
        assert_eq!(detect_render_defaults(&mut term, &config())?, RenderDefaults::default());
        Ok(())
    }
}
