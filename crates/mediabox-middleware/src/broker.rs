//! WebSocket broker that lets independent processes share one bus.
//!
//! [`Broker`] accepts WebSocket clients and relays their traffic through an
//! internal [`EventBus`].  Each client speaks newline-free JSON frames tagged
//! by `op`:
//!
//! | Direction | Frame |
//! |---|---|
//! | client → broker | `{"op":"subscribe","topics":["command"]}` |
//! | client → broker | `{"op":"publish","topic":"command","payload":"{...}"}` |
//! | broker → client | `{"op":"message","topic":"command","payload":"{...}"}` |
//!
//! The broker is agnostic about the *meaning* of payloads; it only routes
//! them.

use std::collections::HashSet;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use mediabox_types::MediaError;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::shutdown::Shutdown;
use crate::transport::Message;

/// Outbound buffer per connected client.
const CLIENT_BUFFER: usize = 256;

/// Wire frame exchanged between [`Broker`] and
/// [`BrokerClient`][crate::client::BrokerClient].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BrokerFrame {
    Subscribe { topics: Vec<String> },
    Publish { topic: String, payload: String },
    Message { topic: String, payload: String },
}

/// Relay between WebSocket clients.
#[derive(Clone, Default)]
pub struct Broker {
    bus: EventBus,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `addr` and serve until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] if the TCP listener cannot be bound.
    pub async fn serve(self, addr: &str, shutdown: Shutdown) -> Result<(), MediaError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MediaError::Transport(format!("broker bind error on {addr}: {e}")))?;
        self.run(listener, shutdown).await
    }

    /// Serve clients from an already-bound `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), MediaError> {
        match listener.local_addr() {
            Ok(addr) => info!(%addr, "broker listening"),
            Err(e) => warn!(error = %e, "broker listening on unknown address"),
        }

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("broker stopping");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let broker = self.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = broker.handle_client(stream, peer, shutdown).await {
                                error!(peer = %peer, error = %e, "broker client error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "broker accept error");
                    }
                },
            }
        }
    }

    async fn handle_client(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: Shutdown,
    ) -> Result<(), MediaError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| MediaError::Transport(format!("ws handshake from {peer}: {e}")))?;
        debug!(peer = %peer, "client connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let (conn_tx, mut conn_rx) = mpsc::channel::<Message>(CLIENT_BUFFER);
        let mut subscribed: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                // Forward bus traffic to the client.
                Some(message) = conn_rx.recv() => {
                    let frame = BrokerFrame::Message {
                        topic: message.topic,
                        payload: message.payload,
                    };
                    let json = serde_json::to_string(&frame)
                        .map_err(|e| MediaError::Transport(e.to_string()))?;
                    if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                // Handle frames sent by the client.
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        self.handle_frame(text.as_str(), peer, &mut subscribed, &conn_tx);
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }

        debug!(peer = %peer, "client disconnected");
        Ok(())
    }

    fn handle_frame(
        &self,
        text: &str,
        peer: SocketAddr,
        subscribed: &mut HashSet<String>,
        conn_tx: &mpsc::Sender<Message>,
    ) {
        match serde_json::from_str::<BrokerFrame>(text) {
            Ok(BrokerFrame::Subscribe { topics }) => {
                // A connection may carry several local subscriptions; each
                // topic is relayed to it once.
                for topic in topics {
                    if subscribed.insert(topic.clone()) {
                        self.bus.forward_into(&[topic.as_str()], conn_tx.clone());
                    }
                }
            }
            Ok(BrokerFrame::Publish { topic, payload }) => {
                self.bus.publish_to(&topic, payload);
            }
            Ok(BrokerFrame::Message { topic, .. }) => {
                warn!(peer = %peer, topic = %topic, "client sent a broker-only frame");
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "malformed broker frame");
            }
        }
    }
}
