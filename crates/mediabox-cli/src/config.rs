//! Configuration Vault – reads `~/.mediabox/config.toml`.
//!
//! Every field has a default, so a partial file (or no file at all) is
//! fine.  `MEDIABOX_*` environment variables override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings shared by every mediabox process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `host:port` of the message broker.
    #[serde(default = "default_broker_addr")]
    pub broker_addr: String,

    /// Where browsing starts; `Back` never leaves it.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Kernel input device of the infrared receiver.
    #[serde(default = "default_input_device")]
    pub input_device: PathBuf,

    /// Quiet period before the clock may repaint the display.
    #[serde(default = "default_display_cooldown_secs")]
    pub display_cooldown_secs: u64,

    /// Bound on one input-device read.
    #[serde(default = "default_input_poll_ms")]
    pub input_poll_ms: u64,

    /// Track length reported by the simulated audio backend.
    #[serde(default = "default_sim_track_secs")]
    pub sim_track_secs: u64,
}

fn default_broker_addr() -> String {
    "127.0.0.1:7878".to_string()
}
fn default_media_root() -> PathBuf {
    PathBuf::from("/media")
}
fn default_input_device() -> PathBuf {
    PathBuf::from("/dev/input/event0")
}
fn default_display_cooldown_secs() -> u64 {
    10
}
fn default_input_poll_ms() -> u64 {
    200
}
fn default_sim_track_secs() -> u64 {
    180
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_addr: default_broker_addr(),
            media_root: default_media_root(),
            input_device: default_input_device(),
            display_cooldown_secs: default_display_cooldown_secs(),
            input_poll_ms: default_input_poll_ms(),
            sim_track_secs: default_sim_track_secs(),
        }
    }
}

impl Config {
    pub fn display_cooldown(&self) -> Duration {
        Duration::from_secs(self.display_cooldown_secs)
    }

    pub fn input_poll(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms)
    }

    pub fn sim_track_length(&self) -> Duration {
        Duration::from_secs(self.sim_track_secs)
    }
}

/// Return the path to `~/.mediabox/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".mediabox").join("config.toml")
}

/// Load the config file, falling back to defaults when it is absent, then
/// apply environment overrides.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `MEDIABOX_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MEDIABOX_BROKER_ADDR` | `broker_addr` |
/// | `MEDIABOX_MEDIA_ROOT` | `media_root` |
/// | `MEDIABOX_INPUT_DEVICE` | `input_device` |
/// | `MEDIABOX_DISPLAY_COOLDOWN_SECS` | `display_cooldown_secs` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("MEDIABOX_BROKER_ADDR") {
        cfg.broker_addr = v;
    }
    if let Ok(v) = std::env::var("MEDIABOX_MEDIA_ROOT") {
        cfg.media_root = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("MEDIABOX_INPUT_DEVICE") {
        cfg.input_device = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("MEDIABOX_DISPLAY_COOLDOWN_SECS")
        && let Ok(secs) = v.parse::<u64>()
    {
        cfg.display_cooldown_secs = secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn config_path_points_to_mediabox_dir() {
        let p = config_path_for_home("/home/listener");
        assert_eq!(p, PathBuf::from("/home/listener/.mediabox/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let (_dir, path) = write_config("media_root = \"/srv/music\"\ndisplay_cooldown_secs = 5\n");
        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.media_root, PathBuf::from("/srv/music"));
        assert_eq!(cfg.display_cooldown(), Duration::from_secs(5));
        assert_eq!(cfg.broker_addr, "127.0.0.1:7878");
        assert_eq!(cfg.input_poll(), Duration::from_millis(200));
    }

    #[test]
    fn full_default_file_round_trips() {
        let raw = toml::to_string_pretty(&Config::default()).unwrap();
        let (_dir, path) = write_config(&raw);
        assert_eq!(load_from(&path).unwrap(), Some(Config::default()));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let (_dir, path) = write_config("display_cooldown_secs = \"soon\"");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"), "unexpected error: {err}");
    }

    #[test]
    fn apply_env_overrides_changes_broker_addr() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("MEDIABOX_BROKER_ADDR", "10.0.0.2:7000") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.broker_addr, "10.0.0.2:7000");
        unsafe { std::env::remove_var("MEDIABOX_BROKER_ADDR") };
    }

    #[test]
    fn apply_env_overrides_changes_media_root() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("MEDIABOX_MEDIA_ROOT", "/mnt/usb") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.media_root, PathBuf::from("/mnt/usb"));
        unsafe { std::env::remove_var("MEDIABOX_MEDIA_ROOT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_cooldown() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var("MEDIABOX_DISPLAY_COOLDOWN_SECS", "later") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.display_cooldown_secs, 10);

        unsafe { std::env::set_var("MEDIABOX_DISPLAY_COOLDOWN_SECS", "3") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.display_cooldown_secs, 3);
        unsafe { std::env::remove_var("MEDIABOX_DISPLAY_COOLDOWN_SECS") };
    }
}
