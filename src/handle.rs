//! # File Handles
//!
//! A [`FileHandle`] binds one [`StorePath`] to a shared backend and exposes
//! the backend operations without a path argument.
//!
//! Handles are cheap to create and clone: constructing one performs no I/O.
//! Renaming ([`FileHandle::set_path`]) is the only handle mutation that
//! touches the backend.

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;

use crate::upload::UploadedFile;
use crate::{Access, ListFilter, StoreBackend, StoreError, StoreExt, StorePath};

/// A path on a specific backend.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use anystore::{AdapterBackend, FileHandle, MemoryAdapter, StoreBackend};
///
/// let backend: Arc<dyn StoreBackend> = Arc::new(AdapterBackend::new(Arc::new(MemoryAdapter::new())));
/// let mut file = FileHandle::parse(backend, "drafts/post.md").unwrap();
/// file.put_contents("hello").unwrap();
/// file.rename("published.md").unwrap();
/// assert_eq!(file.path().to_string(), "drafts/published.md");
/// assert_eq!(file.contents_string().unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct FileHandle {
    backend: Arc<dyn StoreBackend>,
    path: StorePath,
    location: OnceCell<String>,
    url: OnceCell<Option<String>>,
}

impl FileHandle {
    /// Handle for `path` on `backend`.
    pub fn new(backend: Arc<dyn StoreBackend>, path: StorePath) -> Self {
        Self {
            backend,
            path,
            location: OnceCell::new(),
            url: OnceCell::new(),
        }
    }

    /// Handle for a raw path string.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if the path does not normalize
    pub fn parse(backend: Arc<dyn StoreBackend>, path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(backend, StorePath::parse(path)?))
    }

    /// Handle for the root of `backend`.
    pub fn root(backend: Arc<dyn StoreBackend>) -> Self {
        Self::new(backend, StorePath::root())
    }

    /// The backend this handle is bound to.
    #[inline]
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// The path this handle points at.
    #[inline]
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Point the handle at `path`, moving the entry if it exists.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if a non-root handle is pointed at the root
    /// - Everything [`rename`](crate::StoreWrite::rename) returns
    pub fn set_path(&mut self, path: StorePath) -> Result<&mut Self, StoreError> {
        if path == self.path {
            return Ok(self);
        }
        if path.is_root() {
            return Err(StoreError::InvalidPath {
                path: self.path.to_string(),
                reason: "a file handle cannot be moved to the root",
            });
        }
        if self.backend.exists(&self.path)? {
            self.backend.rename(&self.path, &path)?;
        }
        self.path = path;
        self.location = OnceCell::new();
        self.url = OnceCell::new();
        Ok(self)
    }

    /// Change the final path segment, moving the entry if it exists.
    pub fn rename(&mut self, name: &str) -> Result<&mut Self, StoreError> {
        let target = self.path.with_file_name(name)?;
        self.set_path(target)
    }

    /// Handle for a path relative to this one. No I/O.
    pub fn child(&self, relative: &str) -> Result<Self, StoreError> {
        Ok(Self::new(self.backend.clone(), self.path.join(relative)?))
    }

    /// Handle for the parent directory, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        self.path
            .parent()
            .map(|parent| Self::new(self.backend.clone(), parent))
    }

    /// Final path segment.
    pub fn name(&self) -> Option<&str> {
        self.path.basename()
    }

    /// Final path segment without its extension.
    pub fn stem(&self) -> Option<&str> {
        self.path.stem()
    }

    /// Extension of the final path segment.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Absolute local path or remote address, computed once.
    pub fn location(&self) -> &str {
        self.location
            .get_or_init(|| self.backend.location(&self.path))
    }

    /// Public URL, computed once.
    pub fn url(&self) -> Option<&str> {
        self.url
            .get_or_init(|| self.backend.url(&self.path))
            .as_deref()
    }

    /// Returns `true` if the entry exists.
    pub fn exists(&self) -> Result<bool, StoreError> {
        self.backend.exists(&self.path)
    }

    /// Returns `true` if the entry is a regular file.
    pub fn is_file(&self) -> Result<bool, StoreError> {
        self.backend.is_file(&self.path)
    }

    /// Returns `true` if the entry is a directory.
    pub fn is_dir(&self) -> Result<bool, StoreError> {
        self.backend.is_dir(&self.path)
    }

    /// Size in bytes.
    pub fn size(&self) -> Result<u64, StoreError> {
        self.backend.size(&self.path)
    }

    /// Last modification time.
    pub fn mtime(&self) -> Result<SystemTime, StoreError> {
        self.backend.mtime(&self.path)
    }

    /// Mime type.
    pub fn mime_type(&self) -> Result<String, StoreError> {
        self.backend.mime_type(&self.path)
    }

    /// Public/private access.
    pub fn access(&self) -> Result<Access, StoreError> {
        self.backend.access(&self.path)
    }

    /// Change public/private access.
    pub fn set_access(&self, access: Access) -> Result<&Self, StoreError> {
        self.backend.set_access(&self.path, access)?;
        Ok(self)
    }

    /// Whole contents.
    pub fn contents(&self) -> Result<Vec<u8>, StoreError> {
        self.backend.read(&self.path)
    }

    /// Whole contents as UTF-8.
    pub fn contents_string(&self) -> Result<String, StoreError> {
        self.backend.read_to_string(&self.path)
    }

    /// Streaming reader over the contents.
    pub fn read_stream(&self) -> Result<Box<dyn Read + Send>, StoreError> {
        self.backend.read_stream(&self.path)
    }

    /// Replace the contents.
    pub fn put_contents(&self, data: impl AsRef<[u8]>) -> Result<&Self, StoreError> {
        self.backend.write(&self.path, data.as_ref())?;
        Ok(self)
    }

    /// Replace the contents from a reader.
    pub fn put_stream(&self, reader: &mut dyn Read) -> Result<&Self, StoreError> {
        self.backend.write_stream(&self.path, reader)?;
        Ok(self)
    }

    /// Copy the entry to `target` on the same backend.
    pub fn copy_to(&self, target: &StorePath) -> Result<Self, StoreError> {
        self.backend.copy(&self.path, target)?;
        Ok(Self::new(self.backend.clone(), target.clone()))
    }

    /// Create this directory and its parents.
    pub fn mkdir(&self) -> Result<&Self, StoreError> {
        self.backend.mkdir(&self.path)?;
        Ok(self)
    }

    /// Delete the entry (recursively for directories).
    ///
    /// Deleting an absent entry succeeds.
    pub fn delete(&self) -> Result<(), StoreError> {
        match self.backend.delete(&self.path) {
            Err(StoreError::NotFound { .. }) => Ok(()),
            other => other,
        }
    }

    /// Handles for the entries below this directory.
    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Self>, StoreError> {
        Ok(self
            .backend
            .list(&self.path, filter)?
            .into_iter()
            .map(|entry| Self::new(self.backend.clone(), entry.path))
            .collect())
    }

    /// Store an uploaded temporary file at this path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the upload was rejected by the client
    ///   transport
    /// - [`StoreError::BackendFailure`] if the temporary file cannot be opened
    pub fn import_upload(&self, upload: &UploadedFile) -> Result<&Self, StoreError> {
        if let Some(reason) = upload.error.rejection() {
            return Err(StoreError::config(format!(
                "upload {:?} failed: {reason}",
                upload.name
            )));
        }
        let mut file = std::fs::File::open(&upload.temp_path)
            .map_err(|e| StoreError::backend("import_upload", &self.path, e))?;
        self.put_stream(&mut file)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("location", &self.location.get())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path, f)
    }
}
