//! [`PlaybackReactor`] – drives one [`MediaSession`] from the bus.
//!
//! Everything that can change the session is merged into one select loop:
//! requests on `player`, transport keys on `command`, the one-second
//! position ticker, and the stream's completion signal.  Only one of them
//! is handled at a time.  The ticker exists only while playing and is
//! dropped on every path out of `Playing`, including shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mediabox_hal::{AudioBackend, AudioStream, Completion, TagReader, TrackTags};
use mediabox_kernel::playback::next_state;
use mediabox_kernel::{MediaSession, TrackInfo, samples_to_duration};
use mediabox_middleware::{Message, MessageBus, Shutdown, publish_json};
use mediabox_types::{
    Command, LogicalKey, MediaError, PlayerAction, PlayerRequest, PlayerState, topics,
};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Position sampling period while playing.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

enum Event {
    Message(Message),
    Tick,
    Completed,
    Closed,
}

pub struct PlaybackReactor {
    bus: Arc<dyn MessageBus>,
    audio: Arc<dyn AudioBackend>,
    tags: Arc<dyn TagReader>,
    session: MediaSession,
    stream: Option<Box<dyn AudioStream>>,
    completion: Option<Completion>,
    ticker: Option<Interval>,
}

impl PlaybackReactor {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        audio: Arc<dyn AudioBackend>,
        tags: Arc<dyn TagReader>,
    ) -> Self {
        Self {
            bus,
            audio,
            tags,
            session: MediaSession::new(),
            stream: None,
            completion: None,
            ticker: None,
        }
    }

    pub fn session(&self) -> &MediaSession {
        &self.session
    }

    /// `true` while the position ticker is armed.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Publish the idle snapshot, then serve until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] if the subscription cannot be
    /// opened.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<(), MediaError> {
        let mut inbox = self.bus.subscribe(&[topics::PLAYER, topics::COMMAND]).await?;
        info!("playback engine started");
        self.publish_snapshot().await;

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                result = completion(&mut self.completion) => match result {
                    Ok(()) => Event::Completed,
                    // Stream stopped; its completion will never fire.
                    Err(_) => {
                        self.completion = None;
                        continue;
                    }
                },
                _ = tick(&mut self.ticker) => Event::Tick,
                message = inbox.recv() => match message {
                    Some(message) => Event::Message(message),
                    None => Event::Closed,
                },
            };
            match event {
                Event::Message(message) => self.handle(&message).await,
                Event::Tick => self.on_tick().await,
                Event::Completed => self.on_completed().await,
                Event::Closed => break,
            }
        }

        self.release_stream();
        info!("playback engine stopped");
        Ok(())
    }

    async fn handle(&mut self, message: &Message) {
        match message.topic.as_str() {
            topics::PLAYER => match message.decode::<PlayerRequest>() {
                Ok(request) => self.handle_request(request).await,
                Err(e) => warn!(error = %e, "dropping malformed player request"),
            },
            topics::COMMAND => match message.decode::<Command>() {
                Ok(command) => {
                    if let Some(action) = self.action_for_key(command.key) {
                        self.dispatch(action).await;
                    }
                }
                Err(e) => warn!(error = %e, "dropping malformed command"),
            },
            other => debug!(topic = other, "ignoring message"),
        }
    }

    async fn handle_request(&mut self, request: PlayerRequest) {
        match request.action {
            PlayerAction::Load => match request.path {
                Some(path) => {
                    let playlist = request.playlist.into_iter().map(PathBuf::from).collect();
                    self.load(PathBuf::from(path), playlist).await;
                }
                None => {
                    let e = MediaError::MalformedMessage {
                        topic: topics::PLAYER.to_string(),
                        details: "load request without a path".to_string(),
                    };
                    warn!(error = %e, "dropping player request");
                }
            },
            action => self.dispatch(action).await,
        }
    }

    fn action_for_key(&self, key: LogicalKey) -> Option<PlayerAction> {
        match key {
            LogicalKey::KeyPlaypause if self.session.state() == PlayerState::Playing => {
                Some(PlayerAction::Pause)
            }
            LogicalKey::KeyPlaypause => Some(PlayerAction::Play),
            LogicalKey::KeyStop => Some(PlayerAction::Stop),
            LogicalKey::KeyNext | LogicalKey::KeyFastforward => Some(PlayerAction::Next),
            LogicalKey::KeyPrevious | LogicalKey::KeyRewind => Some(PlayerAction::Previous),
            _ => None,
        }
    }

    /// Replace whatever is loaded with `path` and start playing it.
    async fn load(&mut self, path: PathBuf, playlist: Vec<PathBuf>) {
        if matches!(self.session.state(), PlayerState::Playing | PlayerState::Paused) {
            self.dispatch(PlayerAction::Stop).await;
        }
        if self.session.state() == PlayerState::Loaded {
            self.dispatch(PlayerAction::Unload).await;
        }
        if let Err(e) = next_state(self.session.state(), PlayerAction::Load) {
            warn!(error = %e, "load rejected");
            return;
        }

        let (stream, track) = match self.open_track(&path) {
            Ok(opened) => opened,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load track");
                return;
            }
        };
        if let Err(e) = self.session.apply(PlayerAction::Load) {
            warn!(error = %e, "load rejected");
            return;
        }
        info!(path = %path.display(), title = %track.title, "track loaded");
        self.session.set_track(track);
        self.session.set_playlist(playlist);
        self.stream = Some(stream);
        self.publish_snapshot().await;

        self.dispatch(PlayerAction::Play).await;
    }

    /// Open `path` and read its metadata.  Missing tags are not fatal.
    fn open_track(&self, path: &Path) -> Result<(Box<dyn AudioStream>, TrackInfo), MediaError> {
        let stream = self.audio.open(path)?;
        let total = samples_to_duration(stream.total_samples(), stream.sample_rate());
        let tags = self.tags.read_tags(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "no readable tags");
            TrackTags::default()
        });
        let track = TrackInfo::new(path, &tags.title, &tags.artist, total);
        Ok((stream, track))
    }

    /// Run `action` and any follow-up it triggers (`Next` / `Previous`
    /// resume with `Play`).
    async fn perform(&mut self, action: PlayerAction) -> Result<(), MediaError> {
        let mut pending = Some(action);
        while let Some(action) = pending.take() {
            pending = self.step(action).await?;
        }
        Ok(())
    }

    /// Drive the stream, then commit the transition and publish.  A
    /// rejected action or a driver failure leaves the session as it was
    /// and is returned to the caller.
    async fn step(&mut self, action: PlayerAction) -> Result<Option<PlayerAction>, MediaError> {
        let before = self.session.state();
        next_state(before, action)?;
        self.drive_stream(before, action)?;
        self.session.apply(action)?;
        debug!(%action, from = %before, to = %self.session.state(), "playback transition");
        self.publish_snapshot().await;

        if matches!(action, PlayerAction::Next | PlayerAction::Previous) {
            return self.skip(action, before).await;
        }
        Ok(None)
    }

    /// Run `action` on behalf of a bus message, logging a failure.
    async fn dispatch(&mut self, action: PlayerAction) {
        match self.perform(action).await {
            Ok(()) => {}
            Err(e @ MediaError::InvalidTransition { .. }) => {
                warn!(%action, error = %e, "playback action rejected");
            }
            Err(e) => error!(%action, error = %e, "playback action failed"),
        }
    }

    fn drive_stream(&mut self, before: PlayerState, action: PlayerAction) -> Result<(), MediaError> {
        match action {
            PlayerAction::Play => {
                if before == PlayerState::Paused {
                    self.stream_mut()?.resume()?;
                } else {
                    if self.stream.is_none() {
                        let path = self.track_path()?;
                        let (stream, track) = self.open_track(&path)?;
                        self.stream = Some(stream);
                        self.session.set_track(track);
                    }
                    let completion = self.stream_mut()?.start()?;
                    self.completion = Some(completion);
                }
                self.arm_ticker();
            }
            PlayerAction::Pause => {
                self.stream_mut()?.pause()?;
                self.ticker = None;
            }
            PlayerAction::Stop
            | PlayerAction::Unload
            | PlayerAction::Next
            | PlayerAction::Previous => self.release_stream(),
            PlayerAction::Load => {}
        }
        Ok(())
    }

    /// After `Next` / `Previous`: switch to the neighbouring track and ask
    /// for `Play` if the session was playing or paused.  If the neighbour
    /// cannot be opened the session stays `Loaded` on the old track without
    /// a stream.
    async fn skip(
        &mut self,
        action: PlayerAction,
        before: PlayerState,
    ) -> Result<Option<PlayerAction>, MediaError> {
        let Some(path) = self.session.neighbour(action) else {
            return Ok(None);
        };
        let (stream, track) = self.open_track(&path)?;
        info!(path = %path.display(), "switched track");
        self.session.set_track(track);
        self.stream = Some(stream);
        self.publish_snapshot().await;

        Ok(matches!(before, PlayerState::Playing | PlayerState::Paused).then_some(PlayerAction::Play))
    }

    async fn on_tick(&mut self) {
        let Some(stream) = self.stream.as_ref() else {
            return;
        };
        let elapsed = samples_to_duration(stream.position(), stream.sample_rate());
        self.session.set_elapsed(elapsed);
        self.publish_snapshot().await;
    }

    async fn on_completed(&mut self) {
        self.completion = None;
        if let Some((path, total)) = self.session.track().map(|t| (t.path.clone(), t.total)) {
            self.session.set_elapsed(total);
            info!(path = %path.display(), "track finished");
        }
        self.dispatch(PlayerAction::Stop).await;
    }

    fn arm_ticker(&mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    /// Stop the stream and drop every timer tied to it.
    fn release_stream(&mut self) {
        self.ticker = None;
        self.completion = None;
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }

    fn stream_mut(&mut self) -> Result<&mut Box<dyn AudioStream>, MediaError> {
        self.stream.as_mut().ok_or_else(|| MediaError::Resource {
            resource: "audio stream".to_string(),
            details: "no stream is open".to_string(),
        })
    }

    fn track_path(&self) -> Result<PathBuf, MediaError> {
        self.session
            .track()
            .map(|t| t.path.clone())
            .ok_or_else(|| MediaError::Resource {
                resource: "track".to_string(),
                details: "no track is loaded".to_string(),
            })
    }

    async fn publish_snapshot(&mut self) {
        let snapshot = self.session.snapshot();
        debug!(
            state = %snapshot.media.state,
            current = %snapshot.media.time.current,
            "publishing playback snapshot"
        );
        if let Err(e) = publish_json(self.bus.as_ref(), topics::PLAYBACK, &snapshot).await {
            warn!(error = %e, "failed to publish playback snapshot");
        }
    }
}

async fn completion(slot: &mut Option<Completion>) -> Result<(), tokio::sync::oneshot::error::RecvError> {
    match slot {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
