//! Audio decode/playback contract.
//!
//! The playback engine needs only sample arithmetic and a completion signal
//! from the audio stack: a stream's sample rate and total sample count give
//! its duration, and its current position gives the elapsed time.

use std::path::Path;

use mediabox_types::MediaError;
use tokio::sync::oneshot;

/// Resolves once the stream has played to its end.  Dropped without firing
/// when the stream is stopped.
pub type Completion = oneshot::Receiver<()>;

/// Opens decoded, seekable sample streams.
pub trait AudioBackend: Send + Sync {
    /// Open and decode the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Resource`] when the file cannot be opened or
    /// decoded.
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>, MediaError>;
}

/// One decoded track attached to the output device.
pub trait AudioStream: Send {
    /// Samples per second.
    fn sample_rate(&self) -> u32;

    /// Total number of samples in the stream.
    fn total_samples(&self) -> u64;

    /// Index of the next sample to be played.
    fn position(&self) -> u64;

    /// Start playback from the current position.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Device`] if the output device rejects the stream.
    fn start(&mut self) -> Result<Completion, MediaError>;

    fn pause(&mut self) -> Result<(), MediaError>;

    fn resume(&mut self) -> Result<(), MediaError>;

    /// Halt playback and release the output device.
    fn stop(&mut self);
}
