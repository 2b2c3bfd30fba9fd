use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topic names shared by every process on the bus.
pub mod topics {
    /// Wall-clock ticks from the clock publisher.
    pub const DATETIME: &str = "datetime";
    /// Logical keypresses decoded from the remote control.
    pub const COMMAND: &str = "command";
    /// Full navigation snapshots.
    pub const NAVIGATION: &str = "navigation";
    /// Full playback snapshots.
    pub const PLAYBACK: &str = "playback";
    /// Requests addressed to the playback engine (e.g. "load this file").
    pub const PLAYER: &str = "player";
}

/// `timestamp` field format used on every topic, e.g. `24-05-2024T14:03:10.250`.
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%YT%H:%M:%S%.3f";
/// `date` field format of [`DateTimeEvent`].
pub const DATE_FORMAT: &str = "%d-%m-%Y";
/// `time` field format of [`DateTimeEvent`].
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Fresh local timestamp in [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Render a duration as `MM:SS`.  Minutes are not wrapped into hours.
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

// ---------------------------------------------------------------------------
// Remote control
// ---------------------------------------------------------------------------

/// Device-independent key name decoded from a raw remote-control key code.
///
/// Serialized as the Linux key name, e.g. `"KEY_OK"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalKey {
    KeyProg1,
    KeySwitchvideomode,
    KeyRefresh,
    KeyDvd,
    KeyMedia,
    KeyPageup,
    KeyStop,
    KeyRewind,
    KeyPlaypause,
    KeyFastforward,
    KeyPagedown,
    KeyPrevious,
    KeyUp,
    KeyNext,
    KeyLeft,
    KeyOk,
    KeyRight,
    KeyBackspace,
    KeyDown,
    KeyInfo,
    KeyVolumedown,
    KeyMute,
    KeyVolumeup,
}

/// One decoded keypress, published on [`topics::COMMAND`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub timestamp: String,
    pub key: LogicalKey,
}

impl Command {
    /// Stamp `key` with the current time.
    pub fn now(key: LogicalKey) -> Self {
        Self {
            timestamp: timestamp_now(),
            key,
        }
    }
}

/// Size in bytes of one kernel `input_event` record on 64-bit Linux.
pub const RAW_EVENT_SIZE: usize = 24;

/// Fixed-shape event read from a kernel input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawInputEvent {
    pub time_sec: u64,
    pub time_usec: u64,
    pub kind: u16,
    pub code: u16,
    /// `0` = key up, `1` = key down, `2` = auto-repeat.
    pub value: i32,
}

impl RawInputEvent {
    /// Decode one little-endian `input_event` record.
    pub fn from_le_bytes(buf: &[u8; RAW_EVENT_SIZE]) -> Self {
        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&buf[at..at + 8]);
            u64::from_le_bytes(b)
        };
        Self {
            time_sec: u64_at(0),
            time_usec: u64_at(8),
            kind: u16::from_le_bytes([buf[16], buf[17]]),
            code: u16::from_le_bytes([buf[18], buf[19]]),
            value: i32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
        }
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// One directory or `.mp3` file of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub is_dir: bool,
    pub name: String,
    pub path: String,
}

/// Full navigation state, published on [`topics::NAVIGATION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub timestamp: String,
    pub current_dir: String,
    pub selected_index: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub items: Vec<Entry>,
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// States of one media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Idle,
    Loaded,
    Playing,
    Paused,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerState::Idle => "idle",
            PlayerState::Loaded => "loaded",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Actions accepted by the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    Load,
    Unload,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
}

impl PlayerAction {
    /// Every action, in transition-table column order.
    pub const ALL: [PlayerAction; 7] = [
        PlayerAction::Load,
        PlayerAction::Unload,
        PlayerAction::Play,
        PlayerAction::Pause,
        PlayerAction::Stop,
        PlayerAction::Next,
        PlayerAction::Previous,
    ];
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayerAction::Load => "load",
            PlayerAction::Unload => "unload",
            PlayerAction::Play => "play",
            PlayerAction::Pause => "pause",
            PlayerAction::Stop => "stop",
            PlayerAction::Next => "next",
            PlayerAction::Previous => "previous",
        };
        f.write_str(s)
    }
}

/// Request addressed to the playback engine on [`topics::PLAYER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRequest {
    pub timestamp: String,
    pub action: PlayerAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Sibling tracks used by `next` / `previous`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub playlist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTime {
    pub current: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaData {
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub media_type: String,
    pub state: PlayerState,
    pub time: MediaTime,
    pub data: MediaData,
}

/// Full playback state, published on [`topics::PLAYBACK`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub timestamp: String,
    pub media: Media,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock tick, published on [`topics::DATETIME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeEvent {
    pub timestamp: String,
    pub date: String,
    pub time: String,
}

impl DateTimeEvent {
    pub fn at(instant: DateTime<Local>) -> Self {
        Self {
            timestamp: instant.format(TIMESTAMP_FORMAT).to_string(),
            date: instant.format(DATE_FORMAT).to_string(),
            time: instant.format(TIME_FORMAT).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type shared by every mediabox crate.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Malformed message on '{topic}': {details}")]
    MalformedMessage { topic: String, details: String },

    #[error("Invalid action '{action}' for current state '{state}'")]
    InvalidTransition {
        state: PlayerState,
        action: PlayerAction,
    },

    #[error("Resource failure on {resource}: {details}")]
    Resource { resource: String, details: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Device error on {device}: {details}")]
    Device { device: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),
}
