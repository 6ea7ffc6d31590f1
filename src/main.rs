//! Terminal color detection for sixel math rendering.
//!
//! Queries the terminal for its default foreground and background colors
//! using OSC 10/11 escape sequences.
//!
//! # Usage
//!
//! By default the program prints both colors, as `#rrggbb` or `unknown`:
//!
//! ```text
//! Foreground color: #fcfcfc
//! Background color: #232627
//! ```
//!
//! With `--defaults` it prints the render defaults the colors resolve to,
//! after applying the font, color and margin flags.
//!
//! Exit codes:
//! - 0: Both colors determined (always 0 with `--defaults`)
//! - 1: The terminal could not be restored after querying
//! - 2: At least one color could not be determined
//!
//! # Environment Variables
//!
//! - `DEBUG`: When set, enables debug output to stderr showing the raw
//!   terminal reply and parsed colors.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use sixelmath::{
    Overrides, QueryConfig, RGB, StdTerminal, detect_render_defaults, get_default_background,
    get_default_foreground,
};

/// Query the terminal's default colors for rendering LaTeX math as sixel
/// graphics.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Font size
    #[arg(short, long)]
    size: Option<f64>,

    /// Path to TTF or OTF font with MATH tables
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Font color as named color or hex #RRGGBB
    #[arg(short, long)]
    color: Option<String>,

    /// Background color
    #[arg(short, long)]
    bgcolor: Option<String>,

    /// Pixel margin surrounding equation
    #[arg(short, long)]
    margin: Option<u32>,

    /// Milliseconds to wait for the terminal's reply, 0 to wait forever
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Print the resolved render defaults instead of the raw colors
    #[arg(long)]
    defaults: bool,
}

impl Args {
    fn query_config(&self) -> QueryConfig {
        QueryConfig {
            timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            ..QueryConfig::default()
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            font_size: self.size,
            font: self.font.clone(),
            color: self.color.clone(),
            bgcolor: self.bgcolor.clone(),
            margin: self.margin,
        }
    }
}

fn describe(color: Option<RGB>) -> String {
    color.map_or_else(|| "unknown".to_string(), RGB::to_hex)
}

fn run(args: &Args) -> Result<i32> {
    let config = args.query_config();
    let mut terminal = StdTerminal::with_interrupt_restore(config.restore_on_interrupt);

    if args.defaults {
        let defaults = detect_render_defaults(&mut terminal, &config)?.apply(args.overrides());
        println!("{defaults}");
        return Ok(0);
    }

    let fg = get_default_foreground(&mut terminal, &config)?;
    let bg = get_default_background(&mut terminal, &config)?;

    println!("Foreground color: {}", describe(fg));
    println!("Background color: {}", describe(bg));

    Ok(if fg.is_some() && bg.is_some() { 0 } else { 2 })
}

/// Main entry point: query both colors, print them, and exit with the
/// matching status code.
fn main() {
    let args = Args::parse();

    match run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("sixelmath: {e:#}");
            process::exit(1);
        }
    }
}
