//! Playback state machine and the media session it governs.
//!
//! [`transition`] is the complete `(state, action)` table as one exhaustive
//! match.  [`MediaSession`] holds everything a playback snapshot reports and
//! only changes state through that table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mediabox_types::{
    Media, MediaData, MediaError, MediaTime, PlaybackSnapshot, PlayerAction, PlayerState,
    format_mm_ss, timestamp_now,
};

/// `media.type` of every loaded track.
pub const MEDIA_TYPE: &str = "MP3";

/// Next state for `action` in `state`, or `None` when the action is not
/// allowed there.
pub fn transition(state: PlayerState, action: PlayerAction) -> Option<PlayerState> {
    use PlayerAction as A;
    use PlayerState as S;

    match (state, action) {
        (S::Idle, A::Load) => Some(S::Loaded),
        (S::Idle, A::Unload | A::Play | A::Pause | A::Stop | A::Next | A::Previous) => None,

        (S::Loaded, A::Unload) => Some(S::Idle),
        (S::Loaded, A::Play) => Some(S::Playing),
        (S::Loaded, A::Next | A::Previous) => Some(S::Loaded),
        (S::Loaded, A::Load | A::Pause | A::Stop) => None,

        (S::Playing, A::Pause) => Some(S::Paused),
        (S::Playing, A::Stop | A::Next | A::Previous) => Some(S::Loaded),
        (S::Playing, A::Load | A::Unload | A::Play) => None,

        (S::Paused, A::Play) => Some(S::Playing),
        (S::Paused, A::Stop | A::Next | A::Previous) => Some(S::Loaded),
        (S::Paused, A::Load | A::Unload | A::Pause) => None,
    }
}

/// Like [`transition`], but a rejected action becomes
/// [`MediaError::InvalidTransition`].
pub fn next_state(state: PlayerState, action: PlayerAction) -> Result<PlayerState, MediaError> {
    transition(state, action).ok_or(MediaError::InvalidTransition { state, action })
}

/// Convert a sample count to wall-clock time.
pub fn samples_to_duration(samples: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let rate = u64::from(sample_rate);
    let secs = samples / rate;
    let nanos = (samples % rate) * 1_000_000_000 / rate;
    Duration::new(secs, nanos as u32)
}

/// Metadata of the loaded track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub total: Duration,
}

impl TrackInfo {
    /// Build track info, falling back to the file name for a missing title.
    pub fn new(path: &Path, title: &str, artist: &str, total: Duration) -> Self {
        let title = if title.trim().is_empty() {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            title.to_string()
        };
        Self {
            path: path.to_path_buf(),
            title,
            artist: artist.to_string(),
            total,
        }
    }
}

/// One media session: FSM state, the loaded track, elapsed time, and the
/// playlist used by `next` / `previous`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSession {
    state: PlayerState,
    track: Option<TrackInfo>,
    elapsed: Duration,
    playlist: Vec<PathBuf>,
}

impl Default for MediaSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSession {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            track: None,
            elapsed: Duration::ZERO,
            playlist: Vec::new(),
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn track(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    /// Run `action` through the transition table.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidTransition`] and leaves the session
    /// untouched when the action is not allowed.
    pub fn apply(&mut self, action: PlayerAction) -> Result<PlayerState, MediaError> {
        let next = next_state(self.state, action)?;
        match action {
            PlayerAction::Unload => {
                self.track = None;
                self.playlist.clear();
                self.elapsed = Duration::ZERO;
            }
            PlayerAction::Stop | PlayerAction::Next | PlayerAction::Previous => {
                self.elapsed = Duration::ZERO;
            }
            PlayerAction::Load | PlayerAction::Play | PlayerAction::Pause => {}
        }
        self.state = next;
        Ok(next)
    }

    /// Replace the loaded track's metadata.
    pub fn set_track(&mut self, track: TrackInfo) {
        self.elapsed = Duration::ZERO;
        self.track = Some(track);
    }

    pub fn set_playlist(&mut self, playlist: Vec<PathBuf>) {
        self.playlist = playlist;
    }

    /// Record playback progress, capped at the track length.
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        let total = self.track.as_ref().map_or(elapsed, |t| t.total);
        self.elapsed = elapsed.min(total);
    }

    /// The playlist neighbour of the loaded track for `Next` / `Previous`,
    /// clamped at both ends.  `None` when no track is loaded or it is not
    /// on the playlist.
    pub fn neighbour(&self, action: PlayerAction) -> Option<PathBuf> {
        let current = &self.track.as_ref()?.path;
        let index = self.playlist.iter().position(|p| p == current)?;
        let target = match action {
            PlayerAction::Next => (index + 1).min(self.playlist.len() - 1),
            PlayerAction::Previous => index.saturating_sub(1),
            _ => index,
        };
        self.playlist.get(target).cloned()
    }

    /// Full wire snapshot.  Times are only reported while a track is
    /// playing or paused.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let timed = matches!(self.state, PlayerState::Playing | PlayerState::Paused);
        let (current, total) = match (&self.track, timed) {
            (Some(track), true) => (format_mm_ss(self.elapsed), format_mm_ss(track.total)),
            _ => (String::new(), String::new()),
        };
        let (media_type, title, artist) = match &self.track {
            Some(track) => (MEDIA_TYPE.to_string(), track.title.clone(), track.artist.clone()),
            None => (String::new(), String::new(), String::new()),
        };
        PlaybackSnapshot {
            timestamp: timestamp_now(),
            media: Media {
                media_type,
                state: self.state,
                time: MediaTime { current, total },
                data: MediaData { title, artist },
            },
        }
    }
}
