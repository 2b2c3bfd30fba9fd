//! `mediabox-cli` – configuration and process bootstrap for the mediabox
//! binaries.
//!
//! One binary per process, all talking through `mediabox-broker`:
//!
//! | Binary | Runs |
//! |---|---|
//! | `mediabox-broker` | the WebSocket message broker |
//! | `mediabox-remote` | the remote-control decoder on the evdev device |
//! | `mediabox-navigator` | the navigation engine over `media_root` |
//! | `mediabox-player` | the playback engine |
//! | `mediabox-display` | the display arbiter |
//! | `mediabox-clock` | the clock publisher |

pub mod config;
pub mod process;

pub use config::Config;
