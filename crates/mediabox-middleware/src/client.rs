//! [`BrokerClient`] – the [`MessageBus`] used by standalone processes.
//!
//! One WebSocket connection per process.  A writer task drains outbound
//! frames; a reader task routes inbound messages to every local
//! [`Subscription`] covering the topic.  When the connection drops, all
//! subscriptions end and further publishes fail with
//! [`MediaError::Transport`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use mediabox_types::MediaError;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};

use crate::broker::BrokerFrame;
use crate::transport::{Message, MessageBus, Subscription};

const SUBSCRIPTION_BUFFER: usize = 256;

struct Route {
    topics: Vec<String>,
    tx: mpsc::Sender<Message>,
}

/// Local subscriptions.  `closed` flips once the connection is gone, after
/// which no route is registered.
#[derive(Default)]
struct RouteTable {
    routes: Vec<Route>,
    closed: bool,
}

type Routes = Arc<Mutex<RouteTable>>;

/// Connection to a [`Broker`][crate::broker::Broker].
pub struct BrokerClient {
    url: String,
    outbound: mpsc::UnboundedSender<BrokerFrame>,
    routes: Routes,
}

impl BrokerClient {
    /// Connect to the broker at `addr` (`host:port` or a `ws://` URL).
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Transport`] when the broker is unreachable.
    pub async fn connect(addr: &str) -> Result<Self, MediaError> {
        let url = if addr.starts_with("ws://") || addr.starts_with("wss://") {
            addr.to_string()
        } else {
            format!("ws://{addr}")
        };
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| MediaError::Transport(format!("connect to {url}: {e}")))?;
        debug!(url = %url, "connected to broker");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<BrokerFrame>();
        let routes: Routes = Arc::new(Mutex::new(RouteTable::default()));

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "failed to encode broker frame");
                        continue;
                    }
                };
                if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        let reader_routes = Arc::clone(&routes);
        tokio::spawn(async move {
            while let Some(incoming) = ws_rx.next().await {
                match incoming {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<BrokerFrame>(text.as_str()) {
                        Ok(BrokerFrame::Message { topic, payload }) => {
                            deliver(&reader_routes, Message::new(topic, payload)).await;
                        }
                        Ok(other) => warn!(frame = ?other, "unexpected frame from broker"),
                        Err(e) => warn!(error = %e, "malformed frame from broker"),
                    },
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            warn!("broker connection closed");
            // Dropping every sender ends every local subscription.
            let mut table = lock_routes(&reader_routes);
            table.closed = true;
            table.routes.clear();
        });

        Ok(Self {
            url,
            outbound,
            routes,
        })
    }

    /// The WebSocket URL this client is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn send_frame(&self, frame: BrokerFrame) -> Result<(), MediaError> {
        self.outbound
            .send(frame)
            .map_err(|_| MediaError::Transport(format!("connection to {} is closed", self.url)))
    }
}

#[async_trait]
impl MessageBus for BrokerClient {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), MediaError> {
        self.send_frame(BrokerFrame::Publish {
            topic: topic.to_string(),
            payload,
        })
    }

    async fn subscribe(&self, topics: &[&str]) -> Result<Subscription, MediaError> {
        let topics: Vec<String> = topics.iter().map(|t| t.to_string()).collect();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        {
            let mut table = lock_routes(&self.routes);
            if table.closed {
                return Err(MediaError::Transport(format!(
                    "connection to {} is closed",
                    self.url
                )));
            }
            table.routes.push(Route {
                topics: topics.clone(),
                tx,
            });
        }
        self.send_frame(BrokerFrame::Subscribe {
            topics: topics.clone(),
        })?;
        Ok(Subscription::new(topics, rx))
    }
}

fn lock_routes(routes: &Routes) -> std::sync::MutexGuard<'_, RouteTable> {
    routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn deliver(routes: &Routes, message: Message) {
    let targets: Vec<mpsc::Sender<Message>> = {
        let mut table = lock_routes(routes);
        table.routes.retain(|route| !route.tx.is_closed());
        table
            .routes
            .iter()
            .filter(|route| route.topics.iter().any(|t| *t == message.topic))
            .map(|route| route.tx.clone())
            .collect()
    };
    for tx in targets {
        // A subscription dropped since the snapshot above is pruned next time.
        let _ = tx.send(message.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Broker;
    use crate::shutdown::Shutdown;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn start_broker() -> (String, Shutdown) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let shutdown = Shutdown::new();
        tokio::spawn(Broker::new().run(listener, shutdown.clone()));
        (addr, shutdown)
    }

    #[tokio::test]
    async fn connect_to_missing_broker_fails() {
        // Bind then drop so the port is very likely closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = BrokerClient::connect(&addr).await;
        assert!(matches!(result, Err(MediaError::Transport(_))));
    }

    #[tokio::test]
    async fn message_crosses_the_broker() {
        let (addr, shutdown) = start_broker().await;
        let publisher = BrokerClient::connect(&addr).await.unwrap();
        let subscriber = BrokerClient::connect(&addr).await.unwrap();

        let mut sub = subscriber.subscribe(&["command"]).await.unwrap();
        // Give the broker time to register the subscription.
        tokio::time::sleep(Duration::from_millis(100)).await;

        publisher
            .publish("command", r#"{"key":"KEY_UP"}"#.to_string())
            .await
            .unwrap();

        let message = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("message must arrive")
            .expect("subscription open");
        assert_eq!(message.topic, "command");
        assert_eq!(message.payload, r#"{"key":"KEY_UP"}"#);
        shutdown.trigger();
    }

    #[tokio::test]
    async fn local_subscriptions_share_one_connection() {
        let (addr, shutdown) = start_broker().await;
        let client = BrokerClient::connect(&addr).await.unwrap();

        let mut nav = client.subscribe(&["navigation"]).await.unwrap();
        let mut both = client.subscribe(&["navigation", "datetime"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        client.publish("navigation", "n".to_string()).await.unwrap();
        client.publish("datetime", "d".to_string()).await.unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(tokio::time::timeout(timeout, nav.recv()).await.unwrap().unwrap().payload, "n");
        assert_eq!(tokio::time::timeout(timeout, both.recv()).await.unwrap().unwrap().payload, "n");
        assert_eq!(tokio::time::timeout(timeout, both.recv()).await.unwrap().unwrap().payload, "d");
        let extra = tokio::time::timeout(Duration::from_millis(100), nav.recv()).await;
        assert!(extra.is_err(), "navigation-only subscription must not see datetime");
        shutdown.trigger();
    }

    #[tokio::test]
    async fn subscriptions_end_when_broker_stops() {
        let (addr, shutdown) = start_broker().await;
        let client = BrokerClient::connect(&addr).await.unwrap();
        let mut sub = client.subscribe(&["playback"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.trigger();

        let ended = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await;
        assert!(matches!(ended, Ok(None)), "subscription must close with the connection");
    }

    #[tokio::test]
    async fn subscribe_after_connection_loss_fails() {
        let (addr, shutdown) = start_broker().await;
        let client = BrokerClient::connect(&addr).await.unwrap();
        let mut sub = client.subscribe(&["playback"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.trigger();
        let ended = tokio::time::timeout(Duration::from_secs(2), sub.recv()).await;
        assert!(matches!(ended, Ok(None)));

        let late = client.subscribe(&["navigation"]).await;
        assert!(matches!(late, Err(MediaError::Transport(_))));
    }
}
