//! Result of a thumbnail request.

use crate::FileHandle;

/// How a thumbnail request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbOutcome {
    /// An up-to-date cache entry already existed.
    Fresh,
    /// The entry was (re)generated and written.
    Written,
}

/// A cached thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbFile {
    pub(crate) handle: FileHandle,
    pub(crate) source: FileHandle,
    pub(crate) placeholder: bool,
    pub(crate) outcome: ThumbOutcome,
    pub(crate) watermarked: bool,
    pub(crate) disclaimed: bool,
}

impl ThumbFile {
    /// The cache entry.
    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    /// The image the entry was derived from (the placeholder after a fallback).
    pub fn source(&self) -> &FileHandle {
        &self.source
    }

    /// Returns `true` if the source was unreadable and the placeholder was used.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Whether the entry was reused or written.
    pub fn outcome(&self) -> ThumbOutcome {
        self.outcome
    }

    /// Returns `true` if a watermark was applied.
    pub fn is_watermarked(&self) -> bool {
        self.watermarked
    }

    /// Returns `true` if a disclaimer was applied.
    pub fn is_disclaimed(&self) -> bool {
        self.disclaimed
    }

    /// Public URL of the entry.
    pub fn url(&self) -> Option<&str> {
        self.handle.url()
    }

    /// Consume into the cache entry's handle.
    pub fn into_handle(self) -> FileHandle {
        self.handle
    }
}
