//! Read operations for storage backends.

use std::io::Read;

use crate::{Entry, StoreError, StorePath};

/// Read operations for a storage backend.
///
/// All methods use `&self`. Backends that hold a transport session serialize
/// access to it internally.
///
/// # Root Path
///
/// The root always exists and is a directory. Content operations on it fail
/// with [`StoreError::RootPathForbidden`].
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn StoreRead`.
pub trait StoreRead: Send + Sync {
    /// Check if a path exists.
    ///
    /// Returns `Ok(false)` for absent paths; errors are reserved for
    /// transport failures.
    fn exists(&self, path: &StorePath) -> Result<bool, StoreError>;

    /// Stat a path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path does not exist
    fn metadata(&self, path: &StorePath) -> Result<Entry, StoreError>;

    /// Read entire file contents.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] for the root
    /// - [`StoreError::NotFound`] if the path does not exist
    /// - [`StoreError::NotAFile`] if the path is a directory
    fn read(&self, path: &StorePath) -> Result<Vec<u8>, StoreError>;

    /// Open a file for streaming reads.
    ///
    /// Remote backends may buffer the whole file before returning.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    fn read_stream(&self, path: &StorePath) -> Result<Box<dyn Read + Send>, StoreError>;

    /// Mime type of a file (`inode/directory` for directories).
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path does not exist
    fn mime_type(&self, path: &StorePath) -> Result<String, StoreError>;
}

/// Mime type reported for directories.
pub const DIRECTORY_MIME: &str = "inode/directory";
