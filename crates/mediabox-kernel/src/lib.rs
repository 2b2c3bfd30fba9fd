//! `mediabox-kernel` – Domain Logic
//!
//! Synchronous, I/O-light state machines.  Nothing here touches the bus;
//! the runtime reactors feed these types and publish what they produce.
//!
//! # Modules
//!
//! - [`keymap`] – raw remote-control key codes to [`LogicalKey`][mediabox_types::LogicalKey].
//! - [`navigation`] – [`NavigationEngine`][navigation::NavigationEngine]:
//!   paginated directory browsing jailed to a media root.
//! - [`playback`] – the playback transition table and
//!   [`MediaSession`][playback::MediaSession].
//! - [`frame`] – rendering snapshots into two-line display frames.
//! - [`arbiter`] – [`ArbiterPolicy`][arbiter::ArbiterPolicy]: display
//!   priority and cooldown bookkeeping.

pub mod arbiter;
pub mod frame;
pub mod keymap;
pub mod navigation;
pub mod playback;

pub use arbiter::{ArbiterPolicy, Source, Verdict};
pub use frame::{DisplayFrame, FrameLine, datetime_frame, navigation_frame, playback_frame};
pub use navigation::{Listing, NavAction, NavOutcome, NavigationEngine, list_dir};
pub use playback::{MediaSession, TrackInfo, samples_to_duration, transition};
