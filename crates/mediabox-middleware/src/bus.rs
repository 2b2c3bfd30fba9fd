//! In-process, topic-based publish/subscribe event bus.
//!
//! Uses one [`tokio::sync::broadcast`] channel per topic so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.  Topic channels are created lazily on first use.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | `datetime` | One clock tick per second |
//! | `command` | Decoded remote-control keypresses |
//! | `navigation` | Full directory-browsing snapshots |
//! | `playback` | Playback snapshots, once per second while playing |
//! | `player` | Load requests addressed to the playback engine |
//!
//! The [`Broker`][crate::broker::Broker] uses this bus internally to fan out
//! traffic between WebSocket clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::select_all;
use mediabox_types::MediaError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::transport::{Message, MessageBus, Subscription};

/// Default channel capacity (number of buffered messages before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Shared event bus.  Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Message>>>>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Publish `payload` on `topic`.
    ///
    /// Returns the number of active receivers that were handed the message.
    /// `0` means nobody is listening, which is a normal condition.
    pub fn publish_to(&self, topic: &str, payload: impl Into<String>) -> usize {
        let message = Message::new(topic, payload);
        match self.topic_sender(topic).send(message) {
            Ok(n) => n,
            Err(broadcast::error::SendError(_)) => {
                debug!(topic, "published with no subscribers");
                0
            }
        }
    }

    /// Subscribe to every topic in `topics` with a single merged receiver.
    ///
    /// Must be called from within a Tokio runtime: a forwarding task merges
    /// the per-topic channels and exits once the subscription is dropped.
    pub fn subscribe_to(&self, topics: &[&str]) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.forward_into(topics, tx);
        Subscription::new(topics.iter().map(|t| t.to_string()).collect(), rx)
    }

    /// Feed every message published on `topics` into `tx` until `tx` closes.
    pub fn forward_into(&self, topics: &[&str], tx: mpsc::Sender<Message>) {
        let receivers: Vec<TopicReceiver> = topics
            .iter()
            .map(|topic| TopicReceiver {
                topic: topic.to_string(),
                receiver: self.topic_sender(topic).subscribe(),
            })
            .collect();
        tokio::spawn(forward(receivers, tx));
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn topic_sender(&self, topic: &str) -> broadcast::Sender<Message> {
        let mut topics = self.lock_topics();
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn lock_topics(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<Message>>> {
        // The map holds no invariant a panicking holder could break.
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MessageBus for EventBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MediaError> {
        self.publish_to(topic, payload);
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> Result<Subscription, MediaError> {
        Ok(self.subscribe_to(topics))
    }
}

// ---------------------------------------------------------------------------
// Topic receivers and the merging task
// ---------------------------------------------------------------------------

struct TopicReceiver {
    topic: String,
    receiver: broadcast::Receiver<Message>,
}

async fn forward(mut receivers: Vec<TopicReceiver>, tx: mpsc::Sender<Message>) {
    loop {
        let next = tokio::select! {
            _ = tx.closed() => return,
            next = next_message(&mut receivers) => next,
        };
        match next {
            Some(message) => {
                if tx.send(message).await.is_err() {
                    return;
                }
            }
            None => return,
        }
    }
}

/// Wait for the next message on any receiver.  Lagging is logged and
/// skipped; closed receivers are dropped.  `None` once none remain.
async fn next_message(receivers: &mut Vec<TopicReceiver>) -> Option<Message> {
    loop {
        if receivers.is_empty() {
            return None;
        }
        let (result, index, _) =
            select_all(receivers.iter_mut().map(|r| Box::pin(r.receiver.recv()))).await;
        match result {
            Ok(message) => return Some(message),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(topic = %receivers[index].topic, lagged_by = n, "subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                receivers.swap_remove(index);
            }
        }
    }
}
