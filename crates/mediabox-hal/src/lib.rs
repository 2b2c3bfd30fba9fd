//! `mediabox-hal` – Hardware Abstraction Layer
//!
//! Narrow traits over the appliance's physical devices, plus the drivers
//! and simulation doubles that implement them.
//!
//! # Modules
//!
//! - [`display`] – the two-line [`Display`] contract and text alignment.
//! - [`input`] – the [`InputDevice`] contract for raw key events.
//! - [`audio`] – [`AudioBackend`] / [`AudioStream`], decoded sample streams.
//! - [`tags`] – [`TagReader`], artist/title metadata.
//! - [`evdev`] – [`EvdevInput`], the Linux input-event driver.
//! - [`console`] – [`ConsoleDisplay`], a display that renders into the log.
//! - [`sim`] – recording doubles for headless tests.

pub mod audio;
pub mod console;
pub mod display;
pub mod evdev;
pub mod input;
pub mod sim;
pub mod tags;

pub use audio::{AudioBackend, AudioStream, Completion};
pub use console::ConsoleDisplay;
pub use display::{Align, DISPLAY_WIDTH, Display, Line, align_text};
pub use evdev::EvdevInput;
pub use input::InputDevice;
pub use sim::{DisplayOp, SimAudio, SimDisplay, SimInput, SimTagReader};
pub use tags::{TagReader, TrackTags};
