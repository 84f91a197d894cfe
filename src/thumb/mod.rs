//! # Thumbnails
//!
//! Derived images cached on a [`StoreBackend`](crate::StoreBackend).
//!
//! A [`Thumbnailer`] maps a source [`FileHandle`](crate::FileHandle) and a
//! [`ThumbSpec`] to a cache entry beside the source's mirrored directory:
//!
//! | Request | Cache entry |
//! |---------|-------------|
//! | `photos/cat.jpg`, 200x100 | `photos/cat~200x100.jpg` |
//! | with watermark and disclaimer | `photos/cat~200x100~w~d.jpg` |
//! | unreadable source, placeholder `blank.png` | `noimage/blank~200x100.png` |
//!
//! Entries are regenerated only when the source is newer than the cache.

mod config;
mod file;
mod ops;
mod pipeline;
mod spec;

pub use config::{DISCLAIMER_OFFSET, DISCLAIMER_OPACITY, ThumbnailConfig};
pub use file::{ThumbFile, ThumbOutcome};
pub use pipeline::Thumbnailer;
pub use spec::{PLACEHOLDER_DIR, ThumbSpec};
