//! Directory operations for storage backends.

use crate::{Entry, StoreError, StorePath};

/// Directory operations for a storage backend.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn StoreDir`.
pub trait StoreDir: Send + Sync {
    /// Direct children of a directory, in backend order.
    ///
    /// Callers wanting filtered, sorted or recursive listings use
    /// [`StoreExt::list`](crate::StoreExt::list).
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path does not exist
    /// - [`StoreError::NotADirectory`] if the path is a file
    fn list_children(&self, path: &StorePath) -> Result<Vec<Entry>, StoreError>;

    /// Create a directory and any missing ancestors.
    ///
    /// Succeeds without changes if the directory already exists.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotADirectory`] if the path or an ancestor is a file
    fn mkdir(&self, path: &StorePath) -> Result<(), StoreError>;
}
