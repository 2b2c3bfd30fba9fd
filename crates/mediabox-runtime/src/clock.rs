//! [`ClockPublisher`] – one `datetime` event per second.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use mediabox_middleware::{MessageBus, Shutdown, publish_json};
use mediabox_types::{DateTimeEvent, topics};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

pub struct ClockPublisher {
    bus: Arc<dyn MessageBus>,
    period: Duration,
}

impl ClockPublisher {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Publish the local time every period until `shutdown` fires.  A
    /// failed publish is logged and the next tick carries on.
    pub async fn run(self, shutdown: Shutdown) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("clock publisher started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let event = DateTimeEvent::at(Local::now());
                    if let Err(e) = publish_json(self.bus.as_ref(), topics::DATETIME, &event).await {
                        warn!(error = %e, "failed to publish time");
                    }
                }
            }
        }
        info!("clock publisher stopped");
    }
}
