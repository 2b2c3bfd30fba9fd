//! Generic `InputDevice` trait for the infrared receiver.

use std::time::Duration;

use async_trait::async_trait;
use mediabox_types::{MediaError, RawInputEvent};

/// A source of raw kernel input events, readable with a bounded wait.
#[async_trait]
pub trait InputDevice: Send {
    /// Wait at most `timeout` for the next raw event.
    ///
    /// Returns `Ok(None)` when the wait elapsed without an event.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Device`] on a genuine read failure; callers
    /// treat it as fatal.
    async fn read_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, MediaError>;

    /// Release the device handle.
    fn close(&mut self);
}
