//! In-process hardware doubles for CI and development without the appliance.
//!
//! Every double records what it was asked to do and exposes that record
//! through a cheap clone, so a test can hand one clone to the code under
//! test and keep another for assertions.
//!
//! - [`SimDisplay`] – logs every operation and keeps the two visible lines.
//! - [`SimInput`] – replays scripted key events, then idles.
//! - [`SimAudio`] – fixed-length "tracks" that play against the Tokio clock.
//! - [`SimTagReader`] – tags derived from the file name unless overridden.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use mediabox_types::{MediaError, RawInputEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audio::{AudioBackend, AudioStream, Completion};
use crate::display::{Align, DISPLAY_WIDTH, Display, Line, align_text};
use crate::input::InputDevice;
use crate::tags::{TagReader, TrackTags};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Display
// ────────────────────────────────────────────────────────────────────────────

/// One call made on a [`SimDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Clear,
    Text { line: Line, text: String, align: Align },
    BacklightOn,
    BacklightOff,
    Close,
}

#[derive(Debug)]
struct DisplayState {
    ops: Vec<DisplayOp>,
    lines: [String; 2],
    backlight: bool,
    closed: bool,
}

/// Recording display.  Clones share state.
#[derive(Debug, Clone)]
pub struct SimDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl SimDisplay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                ops: Vec::new(),
                lines: [blank_line(), blank_line()],
                backlight: false,
                closed: false,
            })),
        }
    }

    /// Every operation so far, oldest first.
    pub fn ops(&self) -> Vec<DisplayOp> {
        lock(&self.state).ops.clone()
    }

    /// The two lines as they would currently appear on the panel.
    pub fn lines(&self) -> [String; 2] {
        lock(&self.state).lines.clone()
    }

    pub fn is_blank(&self) -> bool {
        self.lines().iter().all(|l| l.trim().is_empty())
    }

    pub fn backlight(&self) -> bool {
        lock(&self.state).backlight
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    fn record(&self, op: DisplayOp) -> Result<(), MediaError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(MediaError::Device {
                device: "sim-display".to_string(),
                details: "display is closed".to_string(),
            });
        }
        match &op {
            DisplayOp::Clear => state.lines = [blank_line(), blank_line()],
            DisplayOp::Text { line, text, align } => {
                state.lines[line.index()] = align_text(text, *align);
            }
            DisplayOp::BacklightOn => state.backlight = true,
            DisplayOp::BacklightOff => state.backlight = false,
            DisplayOp::Close => state.closed = true,
        }
        state.ops.push(op);
        Ok(())
    }
}

impl Default for SimDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn blank_line() -> String {
    " ".repeat(DISPLAY_WIDTH)
}

impl Display for SimDisplay {
    fn clear(&mut self) -> Result<(), MediaError> {
        self.record(DisplayOp::Clear)
    }

    fn show_text(&mut self, text: &str, line: Line, align: Align) -> Result<(), MediaError> {
        self.record(DisplayOp::Text {
            line,
            text: text.to_string(),
            align,
        })
    }

    fn backlight_on(&mut self) -> Result<(), MediaError> {
        self.record(DisplayOp::BacklightOn)
    }

    fn backlight_off(&mut self) -> Result<(), MediaError> {
        self.record(DisplayOp::BacklightOff)
    }

    fn close(&mut self) -> Result<(), MediaError> {
        self.record(DisplayOp::Close)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// `EV_KEY` event type.
pub const EV_KEY: u16 = 1;

#[derive(Debug, Clone)]
enum InputStep {
    Event(RawInputEvent),
    Fail(String),
}

#[derive(Debug, Default)]
struct InputState {
    script: VecDeque<InputStep>,
    closed: bool,
}

/// Scripted input device.  Clones share the script, so events can be
/// pushed while a decoder is reading.
#[derive(Debug, Clone, Default)]
pub struct SimInput {
    state: Arc<Mutex<InputState>>,
}

impl SimInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw event.
    pub fn push_event(&self, event: RawInputEvent) {
        lock(&self.state).script.push_back(InputStep::Event(event));
    }

    /// Queue a key-down followed by the matching key-up.
    pub fn push_key(&self, code: u16) {
        self.push_event(key_event(code, 1));
        self.push_event(key_event(code, 0));
    }

    /// Queue a read failure.
    pub fn push_failure(&self, details: impl Into<String>) {
        lock(&self.state).script.push_back(InputStep::Fail(details.into()));
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

/// Build an `EV_KEY` event with the given code and value.
pub fn key_event(code: u16, value: i32) -> RawInputEvent {
    RawInputEvent {
        time_sec: 0,
        time_usec: 0,
        kind: EV_KEY,
        code,
        value,
    }
}

#[async_trait]
impl InputDevice for SimInput {
    async fn read_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, MediaError> {
        let step = lock(&self.state).script.pop_front();
        match step {
            Some(InputStep::Event(event)) => Ok(Some(event)),
            Some(InputStep::Fail(details)) => Err(MediaError::Device {
                device: "sim-input".to_string(),
                details,
            }),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        lock(&self.state).closed = true;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Audio
// ────────────────────────────────────────────────────────────────────────────

const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Audio backend whose tracks are silent and of a fixed length.
///
/// The file must exist and be readable; its contents are ignored.
#[derive(Debug, Clone)]
pub struct SimAudio {
    track_length: Duration,
    sample_rate: u32,
    lengths: HashMap<PathBuf, Duration>,
}

impl SimAudio {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            sample_rate: DEFAULT_SAMPLE_RATE,
            lengths: HashMap::new(),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate.max(1);
        self
    }

    /// Give the file at `path` its own length.
    pub fn with_track(mut self, path: impl Into<PathBuf>, length: Duration) -> Self {
        self.lengths.insert(path.into(), length);
        self
    }
}

impl AudioBackend for SimAudio {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>, MediaError> {
        std::fs::File::open(path).map_err(|e| MediaError::Resource {
            resource: path.display().to_string(),
            details: e.to_string(),
        })?;
        let length = self.lengths.get(path).copied().unwrap_or(self.track_length);
        let total_samples = (length.as_millis() as u64 * u64::from(self.sample_rate)) / 1_000;
        Ok(Box::new(SimStream::new(self.sample_rate, total_samples)))
    }
}

/// A silent stream that advances with [`tokio::time`], so paused-clock
/// tests can drive it deterministically.
pub struct SimStream {
    sample_rate: u32,
    total_samples: u64,
    /// Samples played before the current run.
    played: u64,
    running_since: Option<Instant>,
    completion: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    timer: Option<JoinHandle<()>>,
}

impl SimStream {
    fn new(sample_rate: u32, total_samples: u64) -> Self {
        Self {
            sample_rate,
            total_samples,
            played: 0,
            running_since: None,
            completion: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    fn remaining(&self) -> Duration {
        let samples = self.total_samples.saturating_sub(self.played);
        Duration::from_nanos(samples.saturating_mul(1_000_000_000) / u64::from(self.sample_rate))
    }

    fn arm_timer(&mut self) {
        let remaining = self.remaining();
        let completion = Arc::clone(&self.completion);
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            if let Some(tx) = lock(&completion).take() {
                let _ = tx.send(());
            }
        }));
        self.running_since = Some(Instant::now());
    }

    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl AudioStream for SimStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_samples(&self) -> u64 {
        self.total_samples
    }

    fn position(&self) -> u64 {
        let running = self.running_since.map_or(0, |since| {
            (since.elapsed().as_millis() as u64 * u64::from(self.sample_rate)) / 1_000
        });
        (self.played + running).min(self.total_samples)
    }

    fn start(&mut self) -> Result<Completion, MediaError> {
        self.disarm_timer();
        let (tx, rx) = oneshot::channel();
        *lock(&self.completion) = Some(tx);
        self.arm_timer();
        Ok(rx)
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        if self.running_since.is_some() {
            self.played = self.position();
            self.running_since = None;
            self.disarm_timer();
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), MediaError> {
        if self.running_since.is_none() {
            self.arm_timer();
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.running_since.is_some() {
            self.played = self.position();
            self.running_since = None;
        }
        self.disarm_timer();
        // Dropping the sender resolves the completion with an error.
        lock(&self.completion).take();
    }
}

impl Drop for SimStream {
    fn drop(&mut self) {
        self.disarm_timer();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tags
// ────────────────────────────────────────────────────────────────────────────

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Tag reader that uses the file stem as title.
#[derive(Debug, Clone, Default)]
pub struct SimTagReader {
    overrides: HashMap<PathBuf, TrackTags>,
}

impl SimTagReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, path: impl Into<PathBuf>, tags: TrackTags) -> Self {
        self.overrides.insert(path.into(), tags);
        self
    }
}

impl TagReader for SimTagReader {
    fn read_tags(&self, path: &Path) -> Result<TrackTags, MediaError> {
        if let Some(tags) = self.overrides.get(path) {
            return Ok(tags.clone());
        }
        if !path.is_file() {
            return Err(MediaError::Resource {
                resource: path.display().to_string(),
                details: "no such file".to_string(),
            });
        }
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(TrackTags {
            artist: UNKNOWN_ARTIST.to_string(),
            title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_display_tracks_visible_lines() {
        let display = SimDisplay::new();
        let mut driver = display.clone();

        driver.backlight_on().unwrap();
        driver.show_text("Hello", Line::First, Align::Left).unwrap();
        assert_eq!(display.lines()[0], "Hello           ");
        assert!(display.backlight());
        assert!(!display.is_blank());

        driver.clear().unwrap();
        assert!(display.is_blank());
        assert_eq!(display.ops().len(), 3);
    }

    #[test]
    fn sim_display_rejects_writes_after_close() {
        let mut display = SimDisplay::new();
        display.close().unwrap();
        assert!(display.is_closed());
        assert!(display.clear().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sim_input_replays_script_then_times_out() {
        let input = SimInput::new();
        let mut device = input.clone();
        input.push_key(103);

        let timeout = Duration::from_millis(200);
        assert_eq!(device.read_event(timeout).await.unwrap(), Some(key_event(103, 1)));
        assert_eq!(device.read_event(timeout).await.unwrap(), Some(key_event(103, 0)));

        let before = Instant::now();
        assert_eq!(device.read_event(timeout).await.unwrap(), None);
        assert_eq!(before.elapsed(), timeout);

        input.push_failure("unplugged");
        assert!(device.read_event(timeout).await.is_err());
        device.close();
        assert!(input.is_closed());
    }

    #[test]
    fn sim_audio_requires_an_existing_file() {
        let audio = SimAudio::new(Duration::from_secs(3));
        assert!(matches!(
            audio.open(Path::new("/no/such/track.mp3")),
            Err(MediaError::Resource { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sim_stream_advances_pauses_and_completes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let audio = SimAudio::new(Duration::from_secs(3)).with_sample_rate(1_000);
        let mut stream = audio.open(file.path()).unwrap();
        assert_eq!(stream.total_samples(), 3_000);

        let completion = stream.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(stream.position(), 1_000);

        stream.pause().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(stream.position(), 1_000, "paused stream must not advance");

        stream.resume().unwrap();
        tokio::time::timeout(Duration::from_secs(3), completion)
            .await
            .expect("track must complete")
            .expect("completion fires");
        assert_eq!(stream.position(), 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_a_stream_drops_its_completion() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut stream = SimAudio::new(Duration::from_secs(3)).open(file.path()).unwrap();
        let completion = stream.start().unwrap();
        stream.stop();
        assert!(completion.await.is_err());
    }

    #[test]
    fn tag_reader_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Blue Train.mp3");
        std::fs::write(&path, b"").unwrap();

        let tags = SimTagReader::new().read_tags(&path).unwrap();
        assert_eq!(tags.title, "Blue Train");
        assert_eq!(tags.artist, UNKNOWN_ARTIST);

        let custom = TrackTags {
            artist: "Coltrane".to_string(),
            title: "Moment's Notice".to_string(),
        };
        let reader = SimTagReader::new().with_tags(&path, custom.clone());
        assert_eq!(reader.read_tags(&path).unwrap(), custom);
        assert!(SimTagReader::new().read_tags(&dir.path().join("gone.mp3")).is_err());
    }
}
