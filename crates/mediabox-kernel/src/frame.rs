//! Rendering snapshots into two-line display frames.
//!
//! Frames are derived fresh from a snapshot every time and never stored.

use mediabox_hal::{Align, Line, align_text};
use mediabox_types::{DateTimeEvent, NavigationSnapshot, PlaybackSnapshot, PlayerState};

/// Leading marker of the selected entry.
pub const SELECTED_MARKER: char = '+';
/// Prefix that sets directories apart from files.
pub const DIR_PREFIX: char = '-';
/// Last character of line 1 when entries precede the selection.
pub const MORE_ABOVE: char = '^';
/// Last character of line 2 when entries follow the selection.
pub const MORE_BELOW: char = 'v';

/// Entries per page.
const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    pub text: String,
    pub align: Align,
}

impl FrameLine {
    fn left(text: String) -> Self {
        Self {
            text,
            align: Align::Left,
        }
    }

    fn center(text: String) -> Self {
        Self {
            text,
            align: Align::Center,
        }
    }
}

/// What the two-line display should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    pub first: FrameLine,
    pub second: FrameLine,
}

impl DisplayFrame {
    /// Both lines paired with their physical position.
    pub fn lines(&self) -> [(Line, &FrameLine); 2] {
        [(Line::First, &self.first), (Line::Second, &self.second)]
    }
}

/// Pad or truncate to exactly one display line.
pub fn fit(text: &str) -> String {
    align_text(text, Align::Left)
}

fn with_last_char(line: &str, glyph: char) -> String {
    let mut chars: Vec<char> = fit(line).chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = glyph;
    }
    chars.into_iter().collect()
}

/// The page of the listing holding the selection.
pub fn navigation_frame(snapshot: &NavigationSnapshot) -> DisplayFrame {
    let start = snapshot.selected_index / PAGE_SIZE * PAGE_SIZE;
    let mut lines = [String::new(), String::new()];

    for (offset, line) in lines.iter_mut().enumerate() {
        let index = start + offset;
        let Some(entry) = snapshot.items.get(index) else {
            *line = fit("");
            continue;
        };
        let marker = if index == snapshot.selected_index {
            SELECTED_MARKER
        } else {
            ' '
        };
        *line = if entry.is_dir {
            fit(&format!("{marker}{DIR_PREFIX}{}", entry.name))
        } else {
            fit(&format!("{marker}{}", entry.name))
        };
    }

    if snapshot.has_previous {
        lines[0] = with_last_char(&lines[0], MORE_ABOVE);
    }
    if snapshot.has_next && start + 1 < snapshot.items.len() {
        lines[1] = with_last_char(&lines[1], MORE_BELOW);
    }

    let [first, second] = lines;
    DisplayFrame {
        first: FrameLine::left(first),
        second: FrameLine::left(second),
    }
}

/// Glyph shown before the playback time.
pub fn state_glyph(state: PlayerState) -> char {
    match state {
        PlayerState::Playing => '>',
        PlayerState::Paused => '=',
        PlayerState::Loaded => '#',
        PlayerState::Idle => ' ',
    }
}

/// Title on line 1; state glyph and `elapsed/total` on line 2.
pub fn playback_frame(snapshot: &PlaybackSnapshot) -> DisplayFrame {
    let media = &snapshot.media;
    let glyph = state_glyph(media.state);
    let status = if media.time.current.is_empty() || media.time.total.is_empty() {
        format!("{glyph} {}", media.state)
    } else {
        format!("{glyph} {}/{}", media.time.current, media.time.total)
    };
    DisplayFrame {
        first: FrameLine::left(fit(&media.data.title)),
        second: FrameLine::left(fit(&status)),
    }
}

/// Date and time, both centered.
pub fn datetime_frame(event: &DateTimeEvent) -> DisplayFrame {
    DisplayFrame {
        first: FrameLine::center(event.date.clone()),
        second: FrameLine::center(event.time.clone()),
    }
}
