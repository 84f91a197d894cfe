//! Write operations for storage backends.

use std::io::Read;

use crate::{StoreError, StorePath};

/// Write operations for a storage backend.
///
/// Writes create missing parent directories. Newly created entries receive
/// the backend's default access policy; overwriting keeps the existing access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn StoreWrite`.
pub trait StoreWrite: Send + Sync {
    /// Write data to a file, creating or truncating it.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] for the root
    /// - [`StoreError::NotAFile`] if the path is a directory
    /// - [`StoreError::NotADirectory`] if an ancestor is a file
    fn write(&self, path: &StorePath, data: &[u8]) -> Result<(), StoreError>;

    /// Write a file from a reader.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    fn write_stream(&self, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError>;

    /// Delete a file, or a directory with all its contents.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] for the root
    /// - [`StoreError::NotFound`] if the path does not exist
    fn delete(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Move a file or directory.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] if either side is the root
    /// - [`StoreError::SameSource`] if `from == to`
    /// - [`StoreError::NotFound`] if `from` does not exist
    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError>;

    /// Copy a file or directory.
    ///
    /// # Errors
    ///
    /// Same as [`rename`](Self::rename).
    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError>;
}
