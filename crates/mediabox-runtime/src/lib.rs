//! `mediabox-runtime` – The Reactors
//!
//! Each reactor is one process's main loop: it subscribes to its topics,
//! feeds the kernel state machines, drives the HAL, and publishes what
//! changed.  All of them stop cleanly when the shared
//! [`Shutdown`][mediabox_middleware::Shutdown] fires.
//!
//! # Modules
//!
//! - [`remote_control`] – [`RemoteControlDecoder`]: raw input events to
//!   `command`.
//! - [`navigator`] – [`NavigationReactor`]: `command` to `navigation`, and
//!   `load` requests on `player`.
//! - [`player`] – [`PlaybackReactor`]: `player` and transport keys to
//!   `playback`, with the one-second position ticker.
//! - [`display_arbiter`] – [`DisplayArbiter`]: `datetime`, `navigation` and
//!   `playback` onto the two-line display.
//! - [`clock`] – [`ClockPublisher`]: the `datetime` stream.
//! - [`telemetry`] – [`init_tracing`]: global subscriber and optional OTLP
//!   export.

pub mod clock;
pub mod display_arbiter;
pub mod navigator;
pub mod player;
pub mod remote_control;
pub mod telemetry;

pub use clock::ClockPublisher;
pub use display_arbiter::DisplayArbiter;
pub use navigator::NavigationReactor;
pub use player::PlaybackReactor;
pub use remote_control::RemoteControlDecoder;
pub use telemetry::{TracerProviderGuard, init_tracing};
