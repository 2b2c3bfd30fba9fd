//! [`ConsoleDisplay`] – a [`Display`] that renders into the log.
//!
//! Applies the same truncation and alignment rules as the LCD controller and
//! emits the resulting frame as a structured `info` event, which makes the
//! display process usable on a development machine without the I2C panel.

use mediabox_types::MediaError;
use tracing::info;

use crate::display::{Align, DISPLAY_WIDTH, Display, Line, align_text};

pub struct ConsoleDisplay {
    lines: [String; 2],
    backlight: bool,
    closed: bool,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            lines: [" ".repeat(DISPLAY_WIDTH), " ".repeat(DISPLAY_WIDTH)],
            backlight: false,
            closed: false,
        }
    }

    /// The two lines currently shown.
    pub fn lines(&self) -> &[String; 2] {
        &self.lines
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    fn ensure_open(&self) -> Result<(), MediaError> {
        if self.closed {
            return Err(MediaError::Device {
                device: "console".to_string(),
                details: "display is closed".to_string(),
            });
        }
        Ok(())
    }

    fn emit(&self) {
        info!(line1 = %self.lines[0], line2 = %self.lines[1], "display");
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsoleDisplay {
    fn clear(&mut self) -> Result<(), MediaError> {
        self.ensure_open()?;
        for line in &mut self.lines {
            *line = " ".repeat(DISPLAY_WIDTH);
        }
        Ok(())
    }

    fn show_text(&mut self, text: &str, line: Line, align: Align) -> Result<(), MediaError> {
        self.ensure_open()?;
        self.lines[line.index()] = align_text(text, align);
        self.emit();
        Ok(())
    }

    fn backlight_on(&mut self) -> Result<(), MediaError> {
        self.ensure_open()?;
        self.backlight = true;
        Ok(())
    }

    fn backlight_off(&mut self) -> Result<(), MediaError> {
        self.ensure_open()?;
        self.backlight = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), MediaError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_text_aligns_and_clear_blanks() {
        let mut display = ConsoleDisplay::new();
        display.show_text("12:00:00", Line::Second, Align::Center).unwrap();
        assert_eq!(display.lines()[1], "    12:00:00    ");

        display.clear().unwrap();
        assert_eq!(display.lines()[1], " ".repeat(DISPLAY_WIDTH));
    }

    #[test]
    fn closed_display_rejects_writes() {
        let mut display = ConsoleDisplay::new();
        display.backlight_on().unwrap();
        assert!(display.backlight());
        display.close().unwrap();
        assert!(display.show_text("x", Line::First, Align::Left).is_err());
    }
}
