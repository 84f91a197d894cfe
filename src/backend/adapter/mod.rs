//! Backend over a pluggable filesystem [`Adapter`].
//!
//! Adapters speak plain string paths and a [`Visibility`] flag; the
//! [`AdapterBackend`] wraps one and provides the root checks, path prefixing
//! and error mapping of the storage traits.

mod memory;

pub use memory::MemoryAdapter;

use std::io::{self, Read};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use super::{ensure_not_root, ensure_transfer};
use crate::error::{BoxError, io_error};
use crate::traits::{DIRECTORY_MIME, join_url};
use crate::walk::walk_all;
use crate::{
    Access, Entry, FileType, StoreAccess, StoreDir, StoreError, StoreLocation, StorePath,
    StoreRead, StoreWrite,
};

/// Adapter-native access flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Visibility {
    /// Visible to everyone.
    #[default]
    Public,
    /// Visible to the owner only.
    Private,
}

impl From<Access> for Visibility {
    fn from(access: Access) -> Self {
        match access {
            Access::Public => Self::Public,
            Access::Private => Self::Private,
        }
    }
}

impl From<Visibility> for Access {
    fn from(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Public => Self::Public,
            Visibility::Private => Self::Private,
        }
    }
}

/// One row of [`Adapter::list_contents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEntry {
    /// Adapter path, without leading separator.
    pub path: String,
    /// `true` for directories.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Modification time, if the adapter tracks one.
    pub last_modified: Option<SystemTime>,
    /// Visibility, if the adapter tracks one.
    pub visibility: Option<Visibility>,
}

/// Errors raised by adapters.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The adapter cannot report an attribute, usually because the entry is
    /// missing.
    #[error("{attribute} unavailable for {path}")]
    MetadataUnavailable {
        /// Adapter path.
        path: String,
        /// Attribute that was requested.
        attribute: &'static str,
    },

    /// The entry does not exist.
    #[error("no entry at {path}")]
    NotFound {
        /// Adapter path.
        path: String,
    },

    /// I/O error from the underlying medium.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Any other adapter failure.
    #[error("{0}")]
    Other(#[source] BoxError),
}

/// A Flysystem-style filesystem adapter.
///
/// Paths are separator-joined strings relative to the adapter root, with no
/// leading separator; the empty string is the root. Writes create missing
/// parent directories.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn Adapter`.
pub trait Adapter: Send + Sync {
    /// Returns `true` if a file exists at `path`.
    fn file_exists(&self, path: &str) -> Result<bool, AdapterError>;

    /// Returns `true` if a directory exists at `path`.
    fn directory_exists(&self, path: &str) -> Result<bool, AdapterError>;

    /// Read a whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>, AdapterError>;

    /// Open a file for streaming reads.
    fn read_stream(&self, path: &str) -> Result<Box<dyn Read + Send>, AdapterError> {
        Ok(Box::new(io::Cursor::new(self.read(path)?)))
    }

    /// Create or replace a file.
    fn write(&self, path: &str, contents: &[u8], visibility: Visibility) -> Result<(), AdapterError>;

    /// Create or replace a file from a reader.
    fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        visibility: Visibility,
    ) -> Result<(), AdapterError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        self.write(path, &buf, visibility)
    }

    /// Delete a file.
    fn delete(&self, path: &str) -> Result<(), AdapterError>;

    /// Delete a directory and everything below it.
    fn delete_directory(&self, path: &str) -> Result<(), AdapterError>;

    /// Create a directory and its parents.
    fn create_directory(&self, path: &str, visibility: Visibility) -> Result<(), AdapterError>;

    /// Change the visibility of an entry.
    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<(), AdapterError>;

    /// Visibility of an entry.
    fn visibility(&self, path: &str) -> Result<Visibility, AdapterError>;

    /// Mime type of a file.
    fn mime_type(&self, path: &str) -> Result<String, AdapterError>;

    /// Modification time of an entry.
    fn last_modified(&self, path: &str) -> Result<SystemTime, AdapterError>;

    /// Size of a file.
    fn file_size(&self, path: &str) -> Result<u64, AdapterError>;

    /// Entries below a directory; `deep` includes all descendants.
    fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<AdapterEntry>, AdapterError>;

    /// Move a file, creating the destination's parents.
    fn move_file(&self, from: &str, to: &str) -> Result<(), AdapterError>;

    /// Copy a file, creating the destination's parents.
    fn copy_file(&self, from: &str, to: &str) -> Result<(), AdapterError>;
}

/// Storage backend delegating to an [`Adapter`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use anystore::{AdapterBackend, MemoryAdapter, StoreExt, StorePath, StoreWrite};
///
/// let backend = AdapterBackend::new(Arc::new(MemoryAdapter::new()));
/// let path = StorePath::parse("notes/today.txt").unwrap();
/// backend.write(&path, b"12345").unwrap();
/// assert_eq!(backend.size(&path).unwrap(), 5);
/// ```
pub struct AdapterBackend {
    adapter: Arc<dyn Adapter>,
    prefix: StorePath,
    default_access: Access,
    base_url: Option<String>,
}

impl AdapterBackend {
    /// Wrap `adapter` with public defaults and no prefix.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            adapter,
            prefix: StorePath::root(),
            default_access: Access::Public,
            base_url: None,
        }
    }

    /// Resolve every path under `prefix` inside the adapter.
    pub fn with_prefix(mut self, prefix: StorePath) -> Self {
        self.prefix = prefix;
        self
    }

    /// Access given to newly created entries.
    pub fn with_default_access(mut self, access: Access) -> Self {
        self.default_access = access;
        self
    }

    /// Publish files under `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The wrapped adapter.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    fn adapter_path(&self, path: &StorePath) -> String {
        self.prefix.join_path(path).to_string()
    }

    fn entry_from(&self, row: AdapterEntry) -> Result<Entry, StoreError> {
        let full = StorePath::parse(&row.path)?;
        let path = full.strip_prefix(&self.prefix).unwrap_or(full);
        Ok(Entry {
            path,
            file_type: if row.is_dir {
                FileType::Directory
            } else {
                FileType::File
            },
            size: if row.is_dir { 0 } else { row.size },
            modified: row.last_modified.unwrap_or(SystemTime::UNIX_EPOCH),
            access: row.visibility.unwrap_or_default().into(),
        })
    }

    fn kind_of(&self, path: &StorePath) -> Result<Option<FileType>, StoreError> {
        if path.is_root() {
            return Ok(Some(FileType::Directory));
        }
        let p = self.adapter_path(path);
        if self.adapter.file_exists(&p).map_err(adapter_error("stat", path))? {
            Ok(Some(FileType::File))
        } else if self
            .adapter
            .directory_exists(&p)
            .map_err(adapter_error("stat", path))?
        {
            Ok(Some(FileType::Directory))
        } else {
            Ok(None)
        }
    }

    fn require(&self, path: &StorePath) -> Result<FileType, StoreError> {
        self.kind_of(path)?
            .ok_or_else(|| StoreError::NotFound { path: path.clone() })
    }

    /// Fail if any proper ancestor of `path` is a file.
    fn check_ancestors(&self, path: &StorePath) -> Result<(), StoreError> {
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if dir.is_root() {
                break;
            }
            if self.kind_of(&dir)? == Some(FileType::File) {
                return Err(StoreError::NotADirectory { path: dir });
            }
            ancestor = dir.parent();
        }
        Ok(())
    }

    /// Validate a write target and create its parents; returns the visibility
    /// to write with.
    fn prepare_write(&self, path: &StorePath) -> Result<Visibility, StoreError> {
        ensure_not_root(path, "write")?;
        match self.kind_of(path)? {
            Some(FileType::Directory) => Err(StoreError::NotAFile { path: path.clone() }),
            Some(FileType::File) => self
                .adapter
                .visibility(&self.adapter_path(path))
                .map_err(adapter_error("write", path)),
            None => {
                self.create_parent(path)?;
                Ok(self.default_access.into())
            }
        }
    }

    /// Create the missing ancestors of `path` with the default access.
    fn create_parent(&self, path: &StorePath) -> Result<(), StoreError> {
        match path.parent() {
            Some(parent) => self.mkdir(&parent),
            None => Ok(()),
        }
    }

    /// Recreate the tree under `from` at `to`.
    fn copy_tree(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        let tree = walk_all(from, |dir| self.list_children(dir))?;
        self.mkdir(to)?;
        for entry in tree {
            let Some(rel) = entry.path.strip_prefix(from) else {
                continue;
            };
            let target = to.join_path(&rel);
            if entry.is_dir() {
                self.adapter
                    .create_directory(&self.adapter_path(&target), entry.access.into())
                    .map_err(adapter_error("copy", &target))?;
            } else {
                self.adapter
                    .copy_file(&self.adapter_path(&entry.path), &self.adapter_path(&target))
                    .map_err(adapter_error("copy", &entry.path))?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for AdapterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterBackend")
            .field("prefix", &self.prefix)
            .field("default_access", &self.default_access)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Map an adapter error raised while operating on `path`.
fn adapter_error(operation: &'static str, path: &StorePath) -> impl Fn(AdapterError) -> StoreError {
    move |error| match error {
        AdapterError::MetadataUnavailable { .. } | AdapterError::NotFound { .. } => {
            StoreError::NotFound { path: path.clone() }
        }
        AdapterError::Io(e) => io_error(operation, path, e),
        AdapterError::Other(e) => StoreError::backend(operation, path, e),
    }
}

impl StoreRead for AdapterBackend {
    fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        Ok(self.kind_of(path)?.is_some())
    }

    fn metadata(&self, path: &StorePath) -> Result<Entry, StoreError> {
        let file_type = self.require(path)?;
        if path.is_root() {
            return Ok(Entry::root());
        }
        let p = self.adapter_path(path);
        let err = adapter_error("stat", path);
        let (size, modified, access) = match file_type {
            FileType::File => (
                self.adapter.file_size(&p).map_err(&err)?,
                self.adapter.last_modified(&p).map_err(&err)?,
                self.adapter.visibility(&p).map_err(&err)?.into(),
            ),
            // Directories may have neither mtime nor visibility.
            FileType::Directory => (
                0,
                optional(self.adapter.last_modified(&p))
                    .map_err(&err)?
                    .unwrap_or(SystemTime::UNIX_EPOCH),
                optional(self.adapter.visibility(&p))
                    .map_err(&err)?
                    .unwrap_or_default()
                    .into(),
            ),
        };
        Ok(Entry {
            path: path.clone(),
            file_type,
            size,
            modified,
            access,
        })
    }

    fn read(&self, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.require(path)? == FileType::Directory {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        self.adapter
            .read(&self.adapter_path(path))
            .map_err(adapter_error("read", path))
    }

    fn read_stream(&self, path: &StorePath) -> Result<Box<dyn Read + Send>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.require(path)? == FileType::Directory {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        self.adapter
            .read_stream(&self.adapter_path(path))
            .map_err(adapter_error("read", path))
    }

    fn mime_type(&self, path: &StorePath) -> Result<String, StoreError> {
        if self.require(path)? == FileType::Directory {
            return Ok(DIRECTORY_MIME.to_owned());
        }
        self.adapter
            .mime_type(&self.adapter_path(path))
            .map_err(adapter_error("mime_type", path))
    }
}

impl StoreWrite for AdapterBackend {
    fn write(&self, path: &StorePath, data: &[u8]) -> Result<(), StoreError> {
        let visibility = self.prepare_write(path)?;
        self.adapter
            .write(&self.adapter_path(path), data, visibility)
            .map_err(adapter_error("write", path))
    }

    fn write_stream(&self, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError> {
        let visibility = self.prepare_write(path)?;
        self.adapter
            .write_stream(&self.adapter_path(path), reader, visibility)
            .map_err(adapter_error("write", path))
    }

    fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        ensure_not_root(path, "delete")?;
        let p = self.adapter_path(path);
        let removed = match self.require(path)? {
            FileType::File => self.adapter.delete(&p),
            FileType::Directory => self.adapter.delete_directory(&p),
        };
        removed.map_err(adapter_error("delete", path))?;
        debug!(%path, "deleted");
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "move")?;
        match self.require(from)? {
            FileType::File => {
                self.create_parent(to)?;
                self.adapter
                    .move_file(&self.adapter_path(from), &self.adapter_path(to))
                    .map_err(adapter_error("move", from))
            }
            FileType::Directory => {
                self.copy_tree(from, to)?;
                self.adapter
                    .delete_directory(&self.adapter_path(from))
                    .map_err(adapter_error("move", from))
            }
        }
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "copy")?;
        match self.require(from)? {
            FileType::File => {
                self.create_parent(to)?;
                self.adapter
                    .copy_file(&self.adapter_path(from), &self.adapter_path(to))
                    .map_err(adapter_error("copy", from))
            }
            FileType::Directory => self.copy_tree(from, to),
        }
    }
}

impl StoreDir for AdapterBackend {
    fn list_children(&self, path: &StorePath) -> Result<Vec<Entry>, StoreError> {
        if self.require(path)? == FileType::File {
            return Err(StoreError::NotADirectory { path: path.clone() });
        }
        self.adapter
            .list_contents(&self.adapter_path(path), false)
            .map_err(adapter_error("list", path))?
            .into_iter()
            .map(|row| self.entry_from(row))
            .collect()
    }

    fn mkdir(&self, path: &StorePath) -> Result<(), StoreError> {
        match self.kind_of(path)? {
            Some(FileType::Directory) => return Ok(()),
            Some(FileType::File) => return Err(StoreError::NotADirectory { path: path.clone() }),
            None => {}
        }
        self.check_ancestors(path)?;
        self.adapter
            .create_directory(&self.adapter_path(path), self.default_access.into())
            .map_err(adapter_error("mkdir", path))
    }
}

impl StoreAccess for AdapterBackend {
    fn access(&self, path: &StorePath) -> Result<Access, StoreError> {
        Ok(self.metadata(path)?.access)
    }

    fn set_access(&self, path: &StorePath, access: Access) -> Result<(), StoreError> {
        ensure_not_root(path, "set_access")?;
        self.require(path)?;
        self.adapter
            .set_visibility(&self.adapter_path(path), access.into())
            .map_err(adapter_error("set_access", path))
    }
}

impl StoreLocation for AdapterBackend {
    fn location(&self, path: &StorePath) -> String {
        self.adapter_path(path)
    }

    fn url(&self, path: &StorePath) -> Option<String> {
        self.base_url.as_deref().map(|base| join_url(base, path))
    }
}

/// Treat "metadata unavailable" as an absent optional attribute.
fn optional<T>(result: Result<T, AdapterError>) -> Result<Option<T>, AdapterError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AdapterError::MetadataUnavailable { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}
