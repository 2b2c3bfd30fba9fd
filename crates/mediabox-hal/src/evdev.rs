//! [`EvdevInput`] – reads raw `input_event` records from a Linux input
//! device file such as `/dev/input/event0`.
//!
//! Reads block, so a dedicated thread pulls fixed-size records off the file
//! and hands them over a channel; [`InputDevice::read_event`] then waits on
//! that channel with a bounded timeout.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mediabox_types::{MediaError, RAW_EVENT_SIZE, RawInputEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::input::InputDevice;

const EVENT_BUFFER: usize = 64;

/// Linux evdev input device.
pub struct EvdevInput {
    path: PathBuf,
    events: mpsc::Receiver<Result<RawInputEvent, String>>,
}

impl EvdevInput {
    /// Open `path` and start the reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Device`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| device_error(&path, e.to_string()))?;
        let (tx, events) = mpsc::channel(EVENT_BUFFER);

        std::thread::Builder::new()
            .name("evdev-reader".to_string())
            .spawn(move || {
                let mut buf = [0u8; RAW_EVENT_SIZE];
                loop {
                    let item = match file.read_exact(&mut buf) {
                        Ok(()) => Ok(RawInputEvent::from_le_bytes(&buf)),
                        Err(e) => Err(e.to_string()),
                    };
                    let failed = item.is_err();
                    // The receiver is gone once the device was closed.
                    if tx.blocking_send(item).is_err() || failed {
                        break;
                    }
                }
            })
            .map_err(|e| device_error(&path, e.to_string()))?;

        debug!(path = %path.display(), "input device opened");
        Ok(Self { path, events })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InputDevice for EvdevInput {
    async fn read_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, MediaError> {
        match tokio::time::timeout(timeout, self.events.recv()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(Ok(event))) => Ok(Some(event)),
            Ok(Some(Err(details))) => Err(device_error(&self.path, details)),
            Ok(None) => Err(device_error(&self.path, "reader stopped".to_string())),
        }
    }

    fn close(&mut self) {
        // The reader thread exits when its next send fails.
        self.events.close();
        debug!(path = %self.path.display(), "input device closed");
    }
}

fn device_error(path: &Path, details: String) -> MediaError {
    MediaError::Device {
        device: path.display().to_string(),
        details,
    }
}
