//! # Extension Traits
//!
//! Convenience methods derived from the core storage traits.
//!
//! ## Overview
//!
//! [`StoreExt`] holds the queries and listings every caller needs but no
//! backend has to implement: they are default methods over
//! [`metadata`](crate::StoreRead::metadata) and
//! [`list_children`](crate::StoreDir::list_children), with a blanket
//! implementation so any [`StoreBackend`] gets them for free.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](StoreExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](StoreExt::is_dir) | Check if path is a directory |
//! | [`size`](StoreExt::size) | File size in bytes |
//! | [`mtime`](StoreExt::mtime) | Last modification time |
//! | [`read_to_string`](StoreExt::read_to_string) | Read a UTF-8 file |
//! | [`list`](StoreExt::list) | Filtered, sorted, optionally recursive listing |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`StoreExtJson`] adds `read_json` and
//! `write_json`.

use std::time::SystemTime;

use crate::backend::ensure_not_root;
use crate::walk::walk;
use crate::{Entry, ListFilter, StoreBackend, StoreError, StorePath};

/// Extension methods for any storage backend.
///
/// # Example
///
/// ```rust
/// use anystore::{ListFilter, StoreBackend, StoreError, StoreExt, StorePath};
///
/// fn total_size(backend: &dyn StoreBackend, dir: &str) -> Result<u64, StoreError> {
///     let entries = backend.list(&StorePath::parse(dir)?, &ListFilter::new().files_only())?;
///     Ok(entries.iter().map(|e| e.size).sum())
/// }
/// ```
pub trait StoreExt: StoreBackend {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_file(&self, path: &StorePath) -> Result<bool, StoreError> {
        match self.metadata(path) {
            Ok(e) => Ok(e.is_file()),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist. The root is always a
    /// directory.
    fn is_dir(&self, path: &StorePath) -> Result<bool, StoreError> {
        match self.metadata(path) {
            Ok(e) => Ok(e.is_dir()),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] for the root
    /// - [`StoreError::NotFound`] if the path doesn't exist
    fn size(&self, path: &StorePath) -> Result<u64, StoreError> {
        ensure_not_root(path, "size")?;
        Ok(self.metadata(path)?.size)
    }

    /// Last modification time.
    ///
    /// # Errors
    ///
    /// - [`StoreError::RootPathForbidden`] for the root
    /// - [`StoreError::NotFound`] if the path doesn't exist
    fn mtime(&self, path: &StorePath) -> Result<SystemTime, StoreError> {
        ensure_not_root(path, "mtime")?;
        Ok(self.metadata(path)?.modified)
    }

    /// Read a file and decode it as UTF-8.
    ///
    /// # Errors
    ///
    /// - Everything [`read`](crate::StoreRead::read) returns
    /// - [`StoreError::BackendFailure`] if the contents are not UTF-8
    fn read_to_string(&self, path: &StorePath) -> Result<String, StoreError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| StoreError::backend("read_to_string", path, e))
    }

    /// List the entries below a directory.
    ///
    /// Entries are filtered by `filter` and sorted by full path. Recursive
    /// filters walk subdirectories up to [`ListFilter::depth`] levels. A
    /// directory that fails the filter is still walked into, except hidden
    /// directories when the filter excludes hidden entries.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path doesn't exist
    /// - [`StoreError::NotADirectory`] if the path is a file
    fn list(&self, path: &StorePath, filter: &ListFilter) -> Result<Vec<Entry>, StoreError> {
        if !self.metadata(path)?.is_dir() {
            return Err(StoreError::NotADirectory { path: path.clone() });
        }
        let mut entries = walk(
            path,
            filter.depth(),
            |dir| self.list_children(dir),
            |entry| filter.descends_into(entry),
        )?;
        entries.retain(|entry| filter.matches(entry));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

impl<B: StoreBackend + ?Sized> StoreExt for B {}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait StoreExtJson: StoreBackend {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - Everything [`read_to_string`](StoreExt::read_to_string) returns
        /// - [`StoreError::BackendFailure`] if the JSON does not parse
        fn read_json<T: DeserializeOwned>(&self, path: &StorePath) -> Result<T, StoreError> {
            let data = self.read_to_string(path)?;
            serde_json::from_str(&data).map_err(|e| StoreError::backend("read_json", path, e))
        }

        /// Serialize a value and write it as pretty-printed JSON.
        ///
        /// # Errors
        ///
        /// - [`StoreError::BackendFailure`] if serialization fails
        /// - Everything [`write`](crate::StoreWrite::write) returns
        fn write_json<T: Serialize>(&self, path: &StorePath, value: &T) -> Result<(), StoreError> {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| StoreError::backend("write_json", path, e))?;
            self.write(path, json.as_bytes())
        }
    }

    impl<B: StoreBackend + ?Sized> StoreExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::StoreExtJson;
