//! [`DisplayArbiter`] – the single owner of the physical display.
//!
//! An actor: bus updates and cooldown expiries arrive in one task and are
//! handled one at a time, so the priority state in [`ArbiterPolicy`] needs
//! no lock.  Re-arming the cooldown aborts the pending timer; an expiry
//! that was already queued is recognised as stale by its generation.

use std::sync::Arc;
use std::time::Duration;

use mediabox_hal::Display;
use mediabox_kernel::{
    ArbiterPolicy, DisplayFrame, Verdict, datetime_frame, navigation_frame, playback_frame,
};
use mediabox_middleware::{Message, MessageBus, Shutdown};
use mediabox_types::{DateTimeEvent, MediaError, NavigationSnapshot, PlaybackSnapshot, topics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Quiet period after which the clock may repaint.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

enum Event {
    Update(Message),
    Expired(u64),
}

pub struct DisplayArbiter<D> {
    bus: Arc<dyn MessageBus>,
    display: D,
    policy: ArbiterPolicy,
    cooldown: Duration,
    timer: Option<JoinHandle<()>>,
    inbox_tx: mpsc::Sender<Event>,
    inbox_rx: mpsc::Receiver<Event>,
}

impl<D: Display> DisplayArbiter<D> {
    pub fn new(bus: Arc<dyn MessageBus>, display: D) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(16);
        Self {
            bus,
            display,
            policy: ArbiterPolicy::new(),
            cooldown: DEFAULT_COOLDOWN,
            timer: None,
            inbox_tx,
            inbox_rx,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Own the display until `shutdown` fires, then blank it, switch the
    /// backlight off, and close it.
    ///
    /// # Errors
    ///
    /// Fails if the subscription cannot be opened or the display cannot be
    /// switched on.  The display is released on every exit path.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<(), MediaError> {
        let mut updates = self
            .bus
            .subscribe(&[topics::DATETIME, topics::NAVIGATION, topics::PLAYBACK])
            .await?;
        if let Err(e) = self.display.clear().and_then(|()| self.display.backlight_on()) {
            self.release();
            return Err(e);
        }
        info!(cooldown_secs = self.cooldown.as_secs(), "display arbiter started");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                Some(event) = self.inbox_rx.recv() => event,
                message = updates.recv() => match message {
                    Some(message) => Event::Update(message),
                    None => break,
                },
            };
            match event {
                Event::Update(message) => self.on_update(&message),
                Event::Expired(generation) => self.on_expired(generation),
            }
        }

        self.release();
        info!("display arbiter stopped");
        Ok(())
    }

    fn on_update(&mut self, message: &Message) {
        let decided = match message.topic.as_str() {
            topics::DATETIME => message
                .decode::<DateTimeEvent>()
                .map(|event| (self.policy.on_datetime(), datetime_frame(&event))),
            topics::NAVIGATION => message
                .decode::<NavigationSnapshot>()
                .map(|snapshot| (self.policy.on_navigation(), navigation_frame(&snapshot))),
            topics::PLAYBACK => message.decode::<PlaybackSnapshot>().map(|snapshot| {
                (self.policy.on_playback(snapshot.media.state), playback_frame(&snapshot))
            }),
            other => {
                debug!(topic = other, "ignoring message");
                return;
            }
        };
        let (verdict, frame) = match decided {
            Ok(decided) => decided,
            Err(e) => {
                warn!(error = %e, "dropping malformed display update");
                return;
            }
        };

        match verdict {
            Verdict::Drop => {}
            Verdict::Render => self.render(&frame, false),
            Verdict::Take { generation } => {
                self.render(&frame, true);
                self.arm_cooldown(generation);
            }
        }
    }

    fn on_expired(&mut self, generation: u64) {
        if self.policy.on_expired(generation) {
            debug!(generation, "cooldown expired");
            self.timer = None;
            if let Err(e) = self.display.clear() {
                error!(error = %e, "failed to clear display");
            }
        }
    }

    fn render(&mut self, frame: &DisplayFrame, clear_first: bool) {
        if let Err(e) = draw(&mut self.display, frame, clear_first) {
            error!(error = %e, "failed to render frame");
        }
    }

    fn arm_cooldown(&mut self, generation: u64) {
        if let Some(pending) = self.timer.take() {
            pending.abort();
        }
        let inbox = self.inbox_tx.clone();
        let cooldown = self.cooldown;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let _ = inbox.send(Event::Expired(generation)).await;
        }));
    }

    fn release(&mut self) {
        if let Some(pending) = self.timer.take() {
            pending.abort();
        }
        if let Err(e) = self.display.clear() {
            error!(error = %e, "failed to clear display");
        }
        if let Err(e) = self.display.backlight_off() {
            error!(error = %e, "failed to switch backlight off");
        }
        if let Err(e) = self.display.close() {
            error!(error = %e, "failed to close display");
        }
    }
}

fn draw<D: Display>(display: &mut D, frame: &DisplayFrame, clear_first: bool) -> Result<(), MediaError> {
    if clear_first {
        display.clear()?;
    }
    for (line, text) in frame.lines() {
        display.show_text(&text.text, line, text.align)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabox_hal::{Align, DisplayOp, Line, SimDisplay};
    use mediabox_middleware::EventBus;

    fn datetime(time: &str) -> Message {
        let event = DateTimeEvent {
            timestamp: String::new(),
            date: "24-05-2024".to_string(),
            time: time.to_string(),
        };
        Message::new(topics::DATETIME, serde_json::to_string(&event).unwrap())
    }

    fn arbiter(display: &SimDisplay) -> DisplayArbiter<SimDisplay> {
        DisplayArbiter::new(Arc::new(EventBus::default()), display.clone())
    }

    #[tokio::test]
    async fn clock_renders_centered_while_screen_is_free() {
        let display = SimDisplay::new();
        let mut arbiter = arbiter(&display);
        arbiter.on_update(&datetime("14:03:10"));
        assert_eq!(display.lines(), ["   24-05-2024   ", "    14:03:10    "]);
    }

    #[tokio::test]
    async fn malformed_update_is_dropped() {
        let display = SimDisplay::new();
        let mut arbiter = arbiter(&display);
        arbiter.on_update(&Message::new(topics::NAVIGATION, "[]"));
        assert!(display.ops().is_empty());
    }

    #[tokio::test]
    async fn stale_expiry_leaves_the_screen_alone() {
        let display = SimDisplay::new();
        let mut arbiter = arbiter(&display);
        let nav = NavigationSnapshot {
            timestamp: String::new(),
            current_dir: "/music".to_string(),
            selected_index: 0,
            has_previous: false,
            has_next: false,
            items: Vec::new(),
        };
        let nav = Message::new(topics::NAVIGATION, serde_json::to_string(&nav).unwrap());
        arbiter.on_update(&nav);
        arbiter.on_update(&nav);
        let ops = display.ops().len();

        arbiter.on_expired(1);
        assert_eq!(display.ops().len(), ops);
        arbiter.on_expired(2);
        assert_eq!(display.ops().last(), Some(&DisplayOp::Clear));
        assert!(arbiter.policy.datetime_allowed());
    }

    #[tokio::test]
    async fn shutdown_blanks_and_closes() {
        let display = SimDisplay::new();
        let shutdown = Shutdown::new();
        shutdown.trigger();
        arbiter(&display).run(shutdown).await.unwrap();

        let ops = display.ops();
        assert_eq!(ops.first(), Some(&DisplayOp::Clear));
        assert_eq!(ops[1], DisplayOp::BacklightOn);
        assert_eq!(
            &ops[ops.len() - 3..],
            &[DisplayOp::Clear, DisplayOp::BacklightOff, DisplayOp::Close]
        );
        assert!(display.is_closed());
    }

    /// Records every call; `clear` fails once `fail_clear_after` calls have
    /// succeeded.
    struct FailingClear {
        calls: Arc<std::sync::Mutex<Vec<&'static str>>>,
        fail_clear_after: usize,
        clears: usize,
    }

    impl FailingClear {
        fn new(fail_clear_after: usize) -> (Self, Arc<std::sync::Mutex<Vec<&'static str>>>) {
            let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
            let display = Self {
                calls: Arc::clone(&calls),
                fail_clear_after,
                clears: 0,
            };
            (display, calls)
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Display for FailingClear {
        fn clear(&mut self) -> Result<(), MediaError> {
            self.record("clear");
            self.clears += 1;
            if self.clears > self.fail_clear_after {
                return Err(MediaError::Device {
                    device: "lcd".to_string(),
                    details: "nack".to_string(),
                });
            }
            Ok(())
        }

        fn show_text(&mut self, _: &str, _: Line, _: Align) -> Result<(), MediaError> {
            self.record("text");
            Ok(())
        }

        fn backlight_on(&mut self) -> Result<(), MediaError> {
            self.record("on");
            Ok(())
        }

        fn backlight_off(&mut self) -> Result<(), MediaError> {
            self.record("off");
            Ok(())
        }

        fn close(&mut self) -> Result<(), MediaError> {
            self.record("close");
            Ok(())
        }
    }

    #[tokio::test]
    async fn backlight_goes_off_even_if_final_clear_fails() {
        let (display, calls) = FailingClear::new(1);
        let shutdown = Shutdown::new();
        shutdown.trigger();
        DisplayArbiter::new(Arc::new(EventBus::default()), display)
            .run(shutdown)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), ["clear", "on", "clear", "off", "close"]);
    }

    #[tokio::test]
    async fn failed_startup_still_releases_the_display() {
        let (display, calls) = FailingClear::new(0);
        let result = DisplayArbiter::new(Arc::new(EventBus::default()), display)
            .run(Shutdown::new())
            .await;

        assert!(matches!(result, Err(MediaError::Device { .. })));
        assert_eq!(*calls.lock().unwrap(), ["clear", "clear", "off", "close"]);
    }
}
