//! Rendering defaults for sixel math output.
//!
//! The renderer takes its colors from the terminal when it can. Defaults are
//! resolved in a fixed order: built-in values, then the colors reported by
//! the terminal, then explicit user overrides.

use std::fmt;
use std::path::PathBuf;

use crate::color::RGB;

/// Built-in font size in points.
pub const DEFAULT_FONT_SIZE: f64 = 24.0;

/// Built-in foreground color.
pub const DEFAULT_COLOR: &str = "#fcfcfc";

/// Built-in background color.
pub const DEFAULT_BGCOLOR: &str = "#232627";

/// Built-in margin around the equation, in pixels.
pub const DEFAULT_MARGIN: u32 = 4;

/// Parameters handed to the math renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDefaults {
    /// Font size in points.
    pub font_size: f64,
    /// Font file with MATH tables; `None` selects the renderer's own font.
    pub font: Option<PathBuf>,
    /// Foreground color, a named color or `#rrggbb`.
    pub color: String,
    /// Background color, a named color or `#rrggbb`.
    pub bgcolor: String,
    /// Margin around the equation, in pixels.
    pub margin: u32,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font: None,
            color: DEFAULT_COLOR.to_string(),
            bgcolor: DEFAULT_BGCOLOR.to_string(),
            margin: DEFAULT_MARGIN,
        }
    }
}

/// User-supplied values; `None` leaves the current value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Font file with MATH tables.
    pub font: Option<PathBuf>,
    /// Foreground color.
    pub color: Option<String>,
    /// Background color.
    pub bgcolor: Option<String>,
    /// Margin in pixels; zero is a valid override.
    pub margin: Option<u32>,
}

impl RenderDefaults {
    /// Replace the colors with the ones reported by the terminal, where known.
    #[must_use]
    pub fn with_terminal_colors(mut self, fg: Option<RGB>, bg: Option<RGB>) -> Self {
        if let Some(fg) = fg {
            self.color = fg.to_hex();
        }
        if let Some(bg) = bg {
            self.bgcolor = bg.to_hex();
        }
        self
    }

    /// Apply user overrides on top of the current values.
    ///
    /// An empty color or background color is ignored.
    #[must_use]
    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(font_size) = overrides.font_size {
            self.font_size = font_size;
        }
        if let Some(font) = overrides.font {
            self.font = Some(font);
        }
        if let Some(color) = overrides.color.filter(|c| !c.is_empty()) {
            self.color = color;
        }
        if let Some(bgcolor) = overrides.bgcolor.filter(|c| !c.is_empty()) {
            self.bgcolor = bgcolor;
        }
        if let Some(margin) = overrides.margin {
            self.margin = margin;
        }
        self
    }
}

impl fmt::Display for RenderDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "size={}", self.font_size)?;
        match &self.font {
            Some(font) => writeln!(f, "font={}", font.display())?,
            None => writeln!(f, "font=")?,
        }
        writeln!(f, "color={}", self.color)?;
        writeln!(f, "bgcolor={}", self.bgcolor)?;
        write!(f, "margin={}", self.margin)
    }
}
