//! [`RemoteControlDecoder`] – infrared receiver to `command` topic.
//!
//! Reads raw input events with a bounded wait, keeps key-down edges whose
//! code is on the remote's key table, and publishes one [`Command`] per
//! press.  The bounded wait is what keeps shutdown responsive: every
//! timeout returns control to the loop, which re-checks the signal.

use std::sync::Arc;
use std::time::Duration;

use mediabox_hal::InputDevice;
use mediabox_kernel::keymap;
use mediabox_middleware::{MessageBus, Shutdown, publish_json};
use mediabox_types::{Command, MediaError, topics};
use tracing::{debug, error, info, warn};

/// Default bound on one device read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct RemoteControlDecoder<I> {
    bus: Arc<dyn MessageBus>,
    input: I,
    poll_interval: Duration,
}

impl<I: InputDevice> RemoteControlDecoder<I> {
    pub fn new(bus: Arc<dyn MessageBus>, input: I) -> Self {
        Self {
            bus,
            input,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Decode until `shutdown` fires.  The device is closed on every exit.
    ///
    /// # Errors
    ///
    /// Returns the device's [`MediaError::Device`] on a genuine read
    /// failure.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<(), MediaError> {
        info!(poll_ms = self.poll_interval.as_millis() as u64, "remote control decoder started");
        let result = self.decode_loop(&shutdown).await;
        self.input.close();
        match &result {
            Ok(()) => info!("remote control decoder stopped"),
            Err(e) => error!(error = %e, "input device failed"),
        }
        result
    }

    async fn decode_loop(&mut self, shutdown: &Shutdown) -> Result<(), MediaError> {
        while !shutdown.is_triggered() {
            let read = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                read = self.input.read_event(self.poll_interval) => read,
            };
            let Some(event) = read? else {
                continue;
            };
            let Some(key) = keymap::decode(&event) else {
                continue;
            };
            debug!(?key, code = event.code, "key pressed");
            if let Err(e) = publish_json(self.bus.as_ref(), topics::COMMAND, &Command::now(key)).await {
                warn!(error = %e, "failed to publish command");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabox_hal::SimInput;
    use mediabox_hal::sim::key_event;
    use mediabox_middleware::EventBus;
    use mediabox_types::LogicalKey;

    #[tokio::test(start_paused = true)]
    async fn publishes_one_command_per_key_down() {
        let bus = EventBus::default();
        let mut commands = bus.subscribe_to(&[topics::COMMAND]);
        let input = SimInput::new();
        input.push_key(103);
        input.push_event(key_event(103, 2));
        input.push_key(999);
        input.push_key(352);

        let shutdown = Shutdown::new();
        let decoder = RemoteControlDecoder::new(Arc::new(bus.clone()), input.clone());
        let task = tokio::spawn(decoder.run(shutdown.clone()));

        let first: Command = commands.recv().await.unwrap().decode().unwrap();
        let second: Command = commands.recv().await.unwrap().decode().unwrap();
        assert_eq!(first.key, LogicalKey::KeyUp);
        assert_eq!(second.key, LogicalKey::KeyOk);

        shutdown.trigger();
        task.await.unwrap().unwrap();
        assert!(input.is_closed());
        assert!(commands.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn read_failure_is_fatal_and_closes_the_device() {
        let bus = EventBus::default();
        let input = SimInput::new();
        input.push_failure("device unplugged");

        let decoder = RemoteControlDecoder::new(Arc::new(bus), input.clone());
        let result = decoder.run(Shutdown::new()).await;
        assert!(matches!(result, Err(MediaError::Device { .. })));
        assert!(input.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_device_still_stops_on_shutdown() {
        let input = SimInput::new();
        let shutdown = Shutdown::new();
        let decoder = RemoteControlDecoder::new(Arc::new(EventBus::default()), input.clone())
            .with_poll_interval(Duration::from_secs(5));
        let task = tokio::spawn(decoder.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.trigger();
        task.await.unwrap().unwrap();
        assert!(input.is_closed());
    }
}
