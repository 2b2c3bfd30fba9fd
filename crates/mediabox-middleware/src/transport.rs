//! The transport contract every process codes against.
//!
//! Reactors never care whether their peers live in the same process
//! ([`EventBus`][crate::bus::EventBus]) or behind the WebSocket broker
//! ([`BrokerClient`][crate::client::BrokerClient]).  They publish JSON
//! payloads to named topics and consume a [`Subscription`].
//!
//! # Delivery contract
//!
//! * `publish` is fire-and-forget and at-most-once.  It fails only when the
//!   underlying connection is gone.
//! * A subscription sees only messages published after it was created, in
//!   publish order per topic.  There is no ordering between topics.

use async_trait::async_trait;
use mediabox_types::MediaError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::shutdown::Shutdown;

/// One payload received on one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Parse the JSON payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::MalformedMessage`] when the payload does not
    /// match the expected shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MediaError> {
        serde_json::from_str(&self.payload).map_err(|e| MediaError::MalformedMessage {
            topic: self.topic.clone(),
            details: e.to_string(),
        })
    }
}

/// Live sequence of messages for one or more topics.
///
/// Dropping the subscription closes it; the transport notices and stops
/// feeding it.
#[derive(Debug)]
pub struct Subscription {
    topics: Vec<String>,
    receiver: mpsc::Receiver<Message>,
}

impl Subscription {
    pub fn new(topics: Vec<String>, receiver: mpsc::Receiver<Message>) -> Self {
        Self { topics, receiver }
    }

    /// Topics covered by this subscription.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Wait for the next message or for `shutdown` to fire.
    ///
    /// Returns `None` on cancellation or when the transport has closed.
    /// Cancellation wins when both are ready.
    pub async fn next(&mut self, shutdown: &Shutdown) -> Option<Message> {
        tokio::select! {
            biased;
            _ = shutdown.wait() => None,
            msg = self.receiver.recv() => msg,
        }
    }

    /// Wait for the next message without a cancellation signal.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Return a message that is already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

/// A publish/subscribe transport keyed by topic name.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] when the connection is down.  No
    /// retry is attempted.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MediaError>;

    /// Open one subscription covering every topic in `topics`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] when the connection is down.
    async fn subscribe(&self, topics: &[&str]) -> Result<Subscription, MediaError>;
}

/// Serialize `value` as JSON and publish it on `topic`.
pub async fn publish_json<B, T>(bus: &B, topic: &str, value: &T) -> Result<(), MediaError>
where
    B: MessageBus + ?Sized,
    T: Serialize + Sync,
{
    let payload = serde_json::to_string(value).map_err(|e| MediaError::MalformedMessage {
        topic: topic.to_string(),
        details: e.to_string(),
    })?;
    bus.publish(topic, payload).await
}
