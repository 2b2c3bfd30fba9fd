//! [`NavigationEngine`] – directory-browsing state machine.
//!
//! The engine owns one immutable [`Listing`] at a time.  Every mutation
//! builds a complete new listing and swaps the engine's reference to it; a
//! failed rebuild leaves the previous listing in place, so nothing partial
//! is ever observable.
//!
//! Browsing is jailed to the root directory the engine was opened on:
//! `Back` at the root re-lists the root instead of leaving it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediabox_types::{Entry, LogicalKey, MediaError, NavigationSnapshot, timestamp_now};
use tracing::debug;

/// Extension of playable files.
pub const MEDIA_EXTENSION: &str = ".mp3";

/// List `dir`: sub-directories and `.mp3` files, in directory-read order.
///
/// # Errors
///
/// Returns [`MediaError::Resource`] when the directory cannot be read.
pub fn list_dir(dir: &Path) -> Result<Vec<Entry>, MediaError> {
    let resource_error = |e: std::io::Error| MediaError::Resource {
        resource: dir.display().to_string(),
        details: e.to_string(),
    };

    let mut items = Vec::new();
    for dir_entry in fs::read_dir(dir).map_err(resource_error)? {
        let dir_entry = dir_entry.map_err(resource_error)?;
        let path = dir_entry.path();
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        // Follows symlinks, so a linked album folder browses like a real one.
        let is_dir = path.is_dir();
        if is_dir || name.ends_with(MEDIA_EXTENSION) {
            items.push(Entry {
                is_dir,
                name,
                path: path.display().to_string(),
            });
        }
    }
    Ok(items)
}

// ────────────────────────────────────────────────────────────────────────────
// Actions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Next,
    Previous,
    Enter,
    Back,
}

impl NavAction {
    /// The navigation action bound to `key`, if any.
    pub fn from_key(key: LogicalKey) -> Option<Self> {
        match key {
            LogicalKey::KeyDown => Some(NavAction::Next),
            LogicalKey::KeyUp => Some(NavAction::Previous),
            LogicalKey::KeyOk => Some(NavAction::Enter),
            LogicalKey::KeyBackspace => Some(NavAction::Back),
            _ => None,
        }
    }
}

/// What applying an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// The listing was replaced (selection moved or a directory was loaded).
    Updated,
    /// `Enter` on a file.  Navigation state is untouched; the file is handed
    /// to playback together with the directory's other tracks.
    PlayFile { path: PathBuf, playlist: Vec<PathBuf> },
}

// ────────────────────────────────────────────────────────────────────────────
// Listing
// ────────────────────────────────────────────────────────────────────────────

/// One complete, immutable navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    current_dir: PathBuf,
    selected_index: usize,
    items: Vec<Entry>,
}

impl Listing {
    /// Read `dir` and select its first entry.
    pub fn load(dir: &Path) -> Result<Self, MediaError> {
        Ok(Self {
            current_dir: dir.to_path_buf(),
            selected_index: 0,
            items: list_dir(dir)?,
        })
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    pub fn selected(&self) -> Option<&Entry> {
        self.items.get(self.selected_index)
    }

    pub fn has_previous(&self) -> bool {
        self.selected_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.selected_index + 1 < self.items.len()
    }

    /// A copy of this listing with the selection moved to `index`, clamped
    /// to the last entry.
    fn with_selection(&self, index: usize) -> Self {
        Self {
            current_dir: self.current_dir.clone(),
            selected_index: index.min(self.items.len().saturating_sub(1)),
            items: self.items.clone(),
        }
    }

    /// Paths of every playable file in this listing, in listing order.
    pub fn playlist(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| PathBuf::from(&e.path))
            .collect()
    }

    /// Wire form, with both flags derived from the selection.
    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            timestamp: timestamp_now(),
            current_dir: self.current_dir.display().to_string(),
            selected_index: self.selected_index,
            has_previous: self.has_previous(),
            has_next: self.has_next(),
            items: self.items.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// NavigationEngine
// ────────────────────────────────────────────────────────────────────────────

pub struct NavigationEngine {
    root: PathBuf,
    state: Arc<Listing>,
}

impl NavigationEngine {
    /// Open the engine on `root`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Resource`] when `root` cannot be listed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let root = root.into();
        let state = Arc::new(Listing::load(&root)?);
        Ok(Self { root, state })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current listing.  Holders keep a consistent view even after the
    /// engine moves on.
    pub fn state(&self) -> Arc<Listing> {
        Arc::clone(&self.state)
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        self.state.snapshot()
    }

    /// Apply one action.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Resource`] when a directory rebuild fails; the
    /// current listing is kept.
    pub fn apply(&mut self, action: NavAction) -> Result<NavOutcome, MediaError> {
        let current = Arc::clone(&self.state);
        let next = match action {
            NavAction::Next => current.with_selection(current.selected_index + 1),
            NavAction::Previous => current.with_selection(current.selected_index.saturating_sub(1)),
            NavAction::Enter => match current.selected() {
                None => return Ok(NavOutcome::Updated),
                Some(entry) if entry.is_dir => Listing::load(Path::new(&entry.path))?,
                Some(entry) => {
                    return Ok(NavOutcome::PlayFile {
                        path: PathBuf::from(&entry.path),
                        playlist: current.playlist(),
                    });
                }
            },
            NavAction::Back => Listing::load(&self.parent_of(current.current_dir()))?,
        };
        debug!(
            ?action,
            dir = %next.current_dir.display(),
            selected = next.selected_index,
            "navigation updated"
        );
        self.state = Arc::new(next);
        Ok(NavOutcome::Updated)
    }

    fn parent_of(&self, dir: &Path) -> PathBuf {
        match dir.parent() {
            Some(parent) if dir != self.root && parent.starts_with(&self.root) => {
                parent.to_path_buf()
            }
            _ => self.root.clone(),
        }
    }
}
