//! [`NavigationReactor`] – binds the [`NavigationEngine`] to the bus.
//!
//! Consumes `command`, applies the bound navigation action, and republishes
//! the full snapshot on `navigation` after every recognised key, including
//! when the action failed (the snapshot is then the last good one).
//! `Enter` on a file becomes a `load` request on `player`.

use std::path::PathBuf;
use std::sync::Arc;

use mediabox_kernel::{NavAction, NavOutcome, NavigationEngine};
use mediabox_middleware::{Message, MessageBus, Shutdown, publish_json};
use mediabox_types::{Command, MediaError, PlayerAction, PlayerRequest, timestamp_now, topics};
use tracing::{debug, error, info, warn};

pub struct NavigationReactor {
    bus: Arc<dyn MessageBus>,
    engine: NavigationEngine,
}

impl NavigationReactor {
    pub fn new(bus: Arc<dyn MessageBus>, engine: NavigationEngine) -> Self {
        Self { bus, engine }
    }

    pub fn engine(&self) -> &NavigationEngine {
        &self.engine
    }

    /// Publish the initial snapshot, then react to commands until
    /// `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] if the subscription cannot be
    /// opened.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<(), MediaError> {
        let mut commands = self.bus.subscribe(&[topics::COMMAND]).await?;
        info!(root = %self.engine.root().display(), "navigation engine started");
        self.publish_snapshot().await;

        while let Some(message) = commands.next(&shutdown).await {
            self.handle(&message).await;
        }
        info!("navigation engine stopped");
        Ok(())
    }

    async fn handle(&mut self, message: &Message) {
        let command: Command = match message.decode() {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "dropping malformed command");
                return;
            }
        };
        let Some(action) = NavAction::from_key(command.key) else {
            return;
        };

        match self.engine.apply(action) {
            Ok(NavOutcome::Updated) => {}
            Ok(NavOutcome::PlayFile { path, playlist }) => self.request_load(path, playlist).await,
            Err(e) => error!(?action, error = %e, "navigation failed"),
        }
        self.publish_snapshot().await;
    }

    async fn request_load(&self, path: PathBuf, playlist: Vec<PathBuf>) {
        let request = PlayerRequest {
            timestamp: timestamp_now(),
            action: PlayerAction::Load,
            path: Some(path.display().to_string()),
            playlist: playlist.iter().map(|p| p.display().to_string()).collect(),
        };
        info!(path = %path.display(), "requesting playback");
        if let Err(e) = publish_json(self.bus.as_ref(), topics::PLAYER, &request).await {
            warn!(error = %e, "failed to publish player request");
        }
    }

    async fn publish_snapshot(&self) {
        let snapshot = self.engine.snapshot();
        debug!(
            dir = %snapshot.current_dir,
            selected = snapshot.selected_index,
            "publishing navigation snapshot"
        );
        if let Err(e) = publish_json(self.bus.as_ref(), topics::NAVIGATION, &snapshot).await {
            warn!(error = %e, "failed to publish navigation snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediabox_middleware::EventBus;
    use mediabox_types::{LogicalKey, NavigationSnapshot};
    use std::fs;

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Rock")).unwrap();
        fs::write(dir.path().join("song.mp3"), b"").unwrap();
        dir
    }

    fn command(key: LogicalKey) -> Message {
        Message::new(topics::COMMAND, serde_json::to_string(&Command::now(key)).unwrap())
    }

    fn reactor(bus: &EventBus, root: &std::path::Path) -> NavigationReactor {
        NavigationReactor::new(Arc::new(bus.clone()), NavigationEngine::open(root).unwrap())
    }

    #[tokio::test]
    async fn every_recognised_key_republishes_the_snapshot() {
        let lib = library();
        let bus = EventBus::default();
        let mut snapshots = bus.subscribe_to(&[topics::NAVIGATION]);
        let mut reactor = reactor(&bus, lib.path());

        reactor.handle(&command(LogicalKey::KeyDown)).await;
        let snapshot: NavigationSnapshot = snapshots.recv().await.unwrap().decode().unwrap();
        assert_eq!(snapshot.selected_index, 1);
        assert!(snapshot.has_previous);

        // Clamped, but still republished.
        reactor.handle(&command(LogicalKey::KeyDown)).await;
        let snapshot: NavigationSnapshot = snapshots.recv().await.unwrap().decode().unwrap();
        assert_eq!(snapshot.selected_index, 1);
    }

    #[tokio::test]
    async fn unbound_keys_and_garbage_publish_nothing() {
        let lib = library();
        let bus = EventBus::default();
        let mut snapshots = bus.subscribe_to(&[topics::NAVIGATION]);
        let mut reactor = reactor(&bus, lib.path());

        reactor.handle(&command(LogicalKey::KeyVolumeup)).await;
        reactor.handle(&Message::new(topics::COMMAND, "{not json")).await;
        assert!(snapshots.try_recv().is_none());
    }

    #[tokio::test]
    async fn enter_on_file_requests_playback() {
        let lib = library();
        let bus = EventBus::default();
        let mut requests = bus.subscribe_to(&[topics::PLAYER]);
        let mut reactor = reactor(&bus, lib.path());
        let song = reactor
            .engine()
            .snapshot()
            .items
            .iter()
            .position(|e| !e.is_dir)
            .unwrap();
        for _ in 0..song {
            reactor.handle(&command(LogicalKey::KeyDown)).await;
        }

        reactor.handle(&command(LogicalKey::KeyOk)).await;
        let request: PlayerRequest = requests.recv().await.unwrap().decode().unwrap();
        let expected = lib.path().join("song.mp3").display().to_string();
        assert_eq!(request.action, PlayerAction::Load);
        assert_eq!(request.path.as_deref(), Some(expected.as_str()));
        assert_eq!(request.playlist, vec![expected]);
    }

    #[tokio::test]
    async fn run_publishes_initial_snapshot_and_stops_on_shutdown() {
        let lib = library();
        let bus = EventBus::default();
        let mut snapshots = bus.subscribe_to(&[topics::NAVIGATION]);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(reactor(&bus, lib.path()).run(shutdown.clone()));

        let initial: NavigationSnapshot = snapshots.recv().await.unwrap().decode().unwrap();
        assert_eq!(initial.current_dir, lib.path().display().to_string());
        assert_eq!(initial.items.len(), 2);

        shutdown.trigger();
        task.await.unwrap().unwrap();
    }
}
