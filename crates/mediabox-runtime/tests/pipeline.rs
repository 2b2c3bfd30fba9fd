//! Remote keypress to audible track to display, over the in-process bus.

use std::sync::Arc;
use std::time::Duration;

use mediabox_hal::{SimAudio, SimDisplay, SimInput, SimTagReader};
use mediabox_kernel::NavigationEngine;
use mediabox_middleware::{EventBus, MessageBus, Shutdown};
use mediabox_runtime::{DisplayArbiter, NavigationReactor, PlaybackReactor, RemoteControlDecoder};
use mediabox_types::{NavigationSnapshot, PlaybackSnapshot, PlayerState, topics};

const KEY_DOWN: u16 = 108;
const KEY_OK: u16 = 352;

#[tokio::test(start_paused = true)]
async fn remote_key_plays_selected_file_and_display_follows() {
    let library = tempfile::tempdir().unwrap();
    std::fs::write(library.path().join("song.mp3"), b"").unwrap();

    let bus = EventBus::default();
    let shared: Arc<dyn MessageBus> = Arc::new(bus.clone());
    let mut playback = bus.subscribe_to(&[topics::PLAYBACK]);
    let shutdown = Shutdown::new();
    let display = SimDisplay::new();
    let input = SimInput::new();

    let arbiter = tokio::spawn(DisplayArbiter::new(shared.clone(), display.clone()).run(shutdown.clone()));
    let player = tokio::spawn(
        PlaybackReactor::new(
            shared.clone(),
            Arc::new(SimAudio::new(Duration::from_secs(60))),
            Arc::new(SimTagReader::new()),
        )
        .run(shutdown.clone()),
    );
    // Let the display and player subscribe before navigation publishes.
    tokio::time::sleep(Duration::from_millis(1)).await;
    let navigator = tokio::spawn(
        NavigationReactor::new(shared.clone(), NavigationEngine::open(library.path()).unwrap())
            .run(shutdown.clone()),
    );
    let decoder = tokio::spawn(RemoteControlDecoder::new(shared.clone(), input.clone()).run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(display.lines()[0], "+song.mp3       ");

    input.push_key(KEY_OK);
    let playing = loop {
        let snapshot: PlaybackSnapshot = playback.recv().await.unwrap().decode().unwrap();
        if snapshot.media.state == PlayerState::Playing {
            break snapshot;
        }
    };
    assert_eq!(playing.media.data.title, "song");
    assert_eq!(playing.media.time.total, "01:00");

    // Navigation keeps the screen for its cooldown, then playback ticks
    // take over.
    assert_eq!(display.lines()[0], "+song.mp3       ");
    tokio::time::sleep(Duration::from_secs(12)).await;
    let [title, status] = display.lines();
    assert!(title.starts_with("song"), "unexpected title line {title:?}");
    assert!(status.starts_with("> 00:1"), "unexpected status line {status:?}");

    shutdown.trigger();
    for task in [arbiter, player, navigator, decoder] {
        task.await.unwrap().unwrap();
    }
    assert!(display.is_closed());
    assert!(input.is_closed());
}

#[tokio::test(start_paused = true)]
async fn down_key_moves_the_selection() {
    let library = tempfile::tempdir().unwrap();
    std::fs::create_dir(library.path().join("Rock")).unwrap();
    std::fs::write(library.path().join("song.mp3"), b"").unwrap();

    let bus = EventBus::default();
    let shared: Arc<dyn MessageBus> = Arc::new(bus.clone());
    let mut navigation = bus.subscribe_to(&[topics::NAVIGATION]);
    let shutdown = Shutdown::new();
    let input = SimInput::new();

    let navigator = tokio::spawn(
        NavigationReactor::new(shared.clone(), NavigationEngine::open(library.path()).unwrap())
            .run(shutdown.clone()),
    );
    let decoder = tokio::spawn(RemoteControlDecoder::new(shared.clone(), input.clone()).run(shutdown.clone()));

    let initial: NavigationSnapshot = navigation.recv().await.unwrap().decode().unwrap();
    assert_eq!(initial.selected_index, 0);

    input.push_key(KEY_DOWN);
    let moved: NavigationSnapshot = navigation.recv().await.unwrap().decode().unwrap();
    assert_eq!(moved.selected_index, 1);
    assert!(moved.has_previous);
    assert!(!moved.has_next);

    shutdown.trigger();
    navigator.await.unwrap().unwrap();
    decoder.await.unwrap().unwrap();
}
