//! Generic `Display` trait for the two-line character LCD.
//!
//! Drivers implement this trait; the display arbiter only ever talks to the
//! trait, so the I2C controller can be swapped for a console or a test
//! double without touching arbitration logic.

use mediabox_types::MediaError;

/// Characters per display line.
pub const DISPLAY_WIDTH: usize = 16;

/// One of the two physical display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    First,
    Second,
}

impl Line {
    /// Zero-based row index.
    pub fn index(self) -> usize {
        match self {
            Line::First => 0,
            Line::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// A two-line character display.
pub trait Display: Send {
    /// Blank both lines.
    fn clear(&mut self) -> Result<(), MediaError>;

    /// Write `text` on `line`, truncated to [`DISPLAY_WIDTH`] and aligned.
    fn show_text(&mut self, text: &str, line: Line, align: Align) -> Result<(), MediaError>;

    fn backlight_on(&mut self) -> Result<(), MediaError>;

    fn backlight_off(&mut self) -> Result<(), MediaError>;

    /// Release the underlying device.  Further calls may fail.
    fn close(&mut self) -> Result<(), MediaError>;
}

/// Truncate `text` to [`DISPLAY_WIDTH`] characters and pad it to exactly
/// that width according to `align`.
pub fn align_text(text: &str, align: Align) -> String {
    let chars: Vec<char> = text.chars().take(DISPLAY_WIDTH).collect();
    let free = DISPLAY_WIDTH - chars.len();
    let left = match align {
        Align::Left => 0,
        Align::Center => free / 2,
        Align::Right => free,
    };
    let mut line = String::with_capacity(DISPLAY_WIDTH);
    line.extend(std::iter::repeat_n(' ', left));
    line.extend(chars);
    line.extend(std::iter::repeat_n(' ', free - left));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_left_pads_right() {
        assert_eq!(align_text("abc", Align::Left), "abc             ");
    }

    #[test]
    fn align_center_splits_padding() {
        assert_eq!(align_text("14:03:10", Align::Center), "    14:03:10    ");
        assert_eq!(align_text("24-05-2024", Align::Center), "   24-05-2024   ");
    }

    #[test]
    fn align_right_pads_left() {
        assert_eq!(align_text("x", Align::Right), "               x");
    }

    #[test]
    fn long_text_is_truncated() {
        let line = align_text("a very long track title indeed", Align::Center);
        assert_eq!(line, "a very long trac");
        assert_eq!(line.chars().count(), DISPLAY_WIDTH);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let line = align_text("ÁÉÍÓÚáéíóúÇçãõâêô", Align::Left);
        assert_eq!(line.chars().count(), DISPLAY_WIDTH);
    }
}
