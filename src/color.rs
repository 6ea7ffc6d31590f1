//! Color reply parsing.
//!
//! Terminals answer OSC 10/11 queries with an X11 color specification such as
//! `rgb:fcfc/fcfc/fcfc`. This module reduces that specification to an 8-bit
//! per channel color that renders as `#rrggbb`.

use std::fmt;

/// Prefix of the only color specification terminals are expected to send.
const RGB_PREFIX: &str = "rgb:";

/// RGB color representation with red, green, and blue components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RGB {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl RGB {
    /// Create a new RGB color from individual components.
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format the color as a lowercase `#rrggbb` string.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RGB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse the payload of an OSC 10/11 reply into an RGB color.
///
/// The payload must have the form `rgb:<r>/<g>/<b>` where each component is
/// one to four hex digits, in either case. Only the first two digits of each
/// component are kept, so 16-bit channels are truncated to 8 bits. A single
/// digit `h` is read as `hh`.
///
/// # Arguments
///
/// * `payload` - The text between `ESC ] <code> ;` and the terminator
///
/// # Returns
///
/// - `Some(RGB)` for a well-formed specification
/// - `None` for anything else; this function never fails
///
/// # Examples
///
/// ```
/// # use sixelmath::color::{RGB, parse_color};
/// assert_eq!(parse_color("rgb:fcfc/fcfc/fcfc"), Some(RGB::new(0xfc, 0xfc, 0xfc)));
/// assert_eq!(parse_color("#fcfcfc"), None);
/// ```
#[must_use]
pub fn parse_color(payload: &str) -> Option<RGB> {
    let channels = payload.strip_prefix(RGB_PREFIX)?;

    let mut parts = channels.split('/');
    let r = truncate_channel(parts.next()?)?;
    let g = truncate_channel(parts.next()?)?;
    let b = truncate_channel(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    Some(RGB::new(r, g, b))
}

/// Reduce one hex channel of 1-4 digits to its leading byte.
fn truncate_channel(hex: &str) -> Option<u8> {
    if hex.is_empty() || hex.len() > 4 || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let leading = &hex[..hex.len().min(2)];
    let n = u8::from_str_radix(leading, 16).ok()?;
    if leading.len() == 1 {
        // A lone digit scales to the full byte: `a` means `aa`.
        Some(n * 0x11)
    } else {
        Some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_four_digit_channels() {
        assert_eq!(parse_color("rgb:fcfc/fcfc/fcfc"), Some(RGB::new(0xfc, 0xfc, 0xfc)));
        assert_eq!(parse_color("rgb:2323/2627/2727"), Some(RGB::new(0x23, 0x26, 0x27)));
        assert_eq!(parse_color("rgb:0000/0000/0000"), Some(RGB::new(0, 0, 0)));
        assert_eq!(parse_color("rgb:ffff/ffff/ffff"), Some(RGB::new(255, 255, 255)));
        // Truncation, not rounding
        assert_eq!(parse_color("rgb:80ff/7fff/00ff"), Some(RGB::new(0x80, 0x7f, 0x00)));
    }

    #[test]
    fn test_parse_color_short_channels() {
        assert_eq!(parse_color("rgb:ff/00/11"), Some(RGB::new(0xff, 0x00, 0x11)));
        assert_eq!(parse_color("rgb:abc/def/012"), Some(RGB::new(0xab, 0xde, 0x01)));
        assert_eq!(parse_color("rgb:a/0/f"), Some(RGB::new(0xaa, 0x00, 0xff)));
        assert_eq!(parse_color("rgb:1/22/333"), Some(RGB::new(0x11, 0x22, 0x33)));
    }

    #[test]
    fn test_parse_color_case_insensitive() {
        assert_eq!(parse_color("rgb:ABCD/C1AB/230A"), parse_color("rgb:abcd/c1ab/230a"));
        assert_eq!(
            parse_color("rgb:FcFc/fCfC/FCFC").map(RGB::to_hex).as_deref(),
            Some("#fcfcfc")
        );
    }

    #[test]
    fn test_parse_color_unparseable() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("garbage"), None);
        assert_eq!(parse_color("#fcfcfc"), None);
        assert_eq!(parse_color("rgba:1111/2222/3333/4444"), None);
        assert_eq!(parse_color("RGB:1111/2222/3333"), None);
        assert_eq!(parse_color(" rgb:1111/2222/3333"), None);
        assert_eq!(parse_color("rgb:"), None);
        assert_eq!(parse_color("rgb:1111/2222"), None);
        assert_eq!(parse_color("rgb:1111/2222/3333/4444"), None);
        assert_eq!(parse_color("rgb:gggg/0000/0000"), None);
        assert_eq!(parse_color("rgb:00000/0000/0000"), None);
        assert_eq!(parse_color("rgb:0000//0000"), None);
        assert_eq!(parse_color("rgb:+f/00/00"), None);
    }

    #[test]
    fn test_rgb_display() {
        assert_eq!(RGB::new(0xfc, 0xfc, 0xfc).to_string(), "#fcfcfc");
        assert_eq!(RGB::new(0x23, 0x26, 0x27).to_hex(), "#232627");
        assert_eq!(RGB::new(0, 10, 255).to_hex(), "#000aff");
    }

    #[test]
    fn test_rgb_struct() {
        let rgb = RGB::new(100, 150, 200);
        assert_eq!(rgb.r, 100);
        assert_eq!(rgb.g, 150);
        assert_eq!(rgb.b, 200);
        assert_eq!(rgb.to_string(), "#6496c8");
    }
}
