//! Track metadata contract.

use std::path::Path;

use mediabox_types::MediaError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub artist: String,
    pub title: String,
}

/// Reads artist/title metadata from a media file.
pub trait TagReader: Send + Sync {
    /// # Errors
    ///
    /// Returns [`MediaError::Resource`] when the file cannot be opened or
    /// carries no readable tag.
    fn read_tags(&self, path: &Path) -> Result<TrackTags, MediaError>;
}
