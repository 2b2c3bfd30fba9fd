//! `mediabox-middleware` – The Message Bus
//!
//! Routes JSON payloads between the appliance's processes without caring
//! about their meaning.
//!
//! # Modules
//!
//! - [`transport`] – the [`MessageBus`] trait, [`Message`], and
//!   [`Subscription`] every reactor codes against.
//! - [`bus`] – in-process, topic-based publish/subscribe bus built on Tokio
//!   broadcast channels.
//! - [`broker`] – WebSocket broker relaying traffic between processes.
//! - [`client`] – [`BrokerClient`], the [`MessageBus`] used by standalone
//!   processes.
//! - [`shutdown`] – the process-wide cancellation signal.

pub mod broker;
pub mod bus;
pub mod client;
pub mod shutdown;
pub mod transport;

pub use broker::{Broker, BrokerFrame};
pub use bus::EventBus;
pub use client::BrokerClient;
pub use shutdown::Shutdown;
pub use transport::{Message, MessageBus, Subscription, publish_json};
