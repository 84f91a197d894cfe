//! Local disk backend.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::{ensure_not_root, ensure_transfer};
use crate::error::io_error;
use crate::traits::{DIRECTORY_MIME, join_url};
use crate::walk::walk_all;
use crate::{
    Access, AccessModes, Entry, FileType, StoreAccess, StoreDir, StoreError, StoreLocation,
    StorePath, StoreRead, StoreWrite,
};

/// Settings for a [`LocalBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LocalConfig {
    /// Directory all store paths are resolved against.
    pub root: PathBuf,
    /// Access given to newly created entries.
    pub default_access: Access,
    /// Mode bits used to express access.
    pub modes: AccessModes,
    /// Base URL for [`StoreLocation::url`].
    pub base_url: Option<String>,
    /// Create `root` if it does not exist.
    pub create_root: bool,
}

impl LocalConfig {
    /// Defaults for a backend rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Set the access of newly created entries.
    pub fn default_access(mut self, access: Access) -> Self {
        self.default_access = access;
        self
    }

    /// Override the mode bits.
    pub fn modes(mut self, modes: AccessModes) -> Self {
        self.modes = modes;
        self
    }

    /// Publish files under `base_url`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Create the root directory on open.
    pub fn create_root(mut self, create: bool) -> Self {
        self.create_root = create;
        self
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_access: Access::Public,
            modes: AccessModes::default(),
            base_url: None,
            create_root: false,
        }
    }
}

/// Backend storing entries in a directory of the local filesystem.
///
/// # Example
///
/// ```rust,no_run
/// use anystore::{LocalBackend, StorePath, StoreRead, StoreWrite};
///
/// let backend = LocalBackend::open("/srv/uploads")?;
/// let path = StorePath::parse("docs/readme.txt")?;
/// backend.write(&path, b"hello")?;
/// assert_eq!(backend.read(&path)?, b"hello");
/// # Ok::<(), anystore::StoreError>(())
/// ```
#[derive(Debug)]
pub struct LocalBackend {
    root: PathBuf,
    default_access: Access,
    modes: AccessModes,
    base_url: Option<String>,
}

impl LocalBackend {
    /// Open a backend from its settings.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the root is missing (and may not be
    ///   created) or is not a directory
    pub fn new(config: LocalConfig) -> Result<Self, StoreError> {
        let LocalConfig {
            root,
            default_access,
            modes,
            base_url,
            create_root,
        } = config;
        if create_root {
            fs::create_dir_all(&root).map_err(|e| {
                StoreError::config_with(format!("cannot create root {}", root.display()), e)
            })?;
        }
        let meta = fs::metadata(&root).map_err(|e| {
            StoreError::config_with(format!("cannot open root {}", root.display()), e)
        })?;
        if !meta.is_dir() {
            return Err(StoreError::config(format!(
                "root {} is not a directory",
                root.display()
            )));
        }
        debug!(root = %root.display(), "opened local backend");
        Ok(Self {
            root,
            default_access,
            modes,
            base_url,
        })
    }

    /// Open an existing directory with default settings.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::new(LocalConfig::new(root))
    }

    /// Directory store paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &StorePath) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.segments());
        full
    }

    fn stat(&self, path: &StorePath) -> Result<fs::Metadata, StoreError> {
        fs::metadata(self.full_path(path)).map_err(|e| io_error("stat", path, e))
    }

    fn entry_from(path: StorePath, meta: &fs::Metadata) -> Entry {
        let file_type = if meta.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        Entry {
            path,
            file_type,
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            access: access_of(meta),
        }
    }

    fn apply_access(
        &self,
        path: &StorePath,
        file_type: FileType,
        access: Access,
    ) -> Result<(), StoreError> {
        let full = self.full_path(path);
        set_access_bits(&full, self.modes.mode_for(file_type, access))
            .map_err(|e| io_error("set_access", path, e))
    }

    /// Validate a write target and create its parents.
    ///
    /// Returns the full path and whether the file is new.
    fn prepare_write(&self, path: &StorePath) -> Result<(PathBuf, bool), StoreError> {
        ensure_not_root(path, "write")?;
        let full = self.full_path(path);
        let is_new = match fs::metadata(&full) {
            Ok(meta) if meta.is_dir() => return Err(StoreError::NotAFile { path: path.clone() }),
            Ok(_) => false,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(StoreError::backend("write", path, e)),
        };
        if let Some(parent) = path.parent() {
            self.mkdir(&parent)?;
        }
        Ok((full, is_new))
    }

    fn finish_write(&self, path: &StorePath, is_new: bool) -> Result<(), StoreError> {
        if is_new {
            self.apply_access(path, FileType::File, self.default_access)?;
        }
        Ok(())
    }

    fn copy_file(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        fs::copy(self.full_path(from), self.full_path(to)).map_err(|e| io_error("copy", from, e))?;
        Ok(())
    }
}

impl StoreRead for LocalBackend {
    fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        match fs::metadata(self.full_path(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::backend("exists", path, e)),
        }
    }

    fn metadata(&self, path: &StorePath) -> Result<Entry, StoreError> {
        let meta = self.stat(path)?;
        Ok(Self::entry_from(path.clone(), &meta))
    }

    fn read(&self, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.stat(path)?.is_dir() {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        fs::read(self.full_path(path)).map_err(|e| io_error("read", path, e))
    }

    fn read_stream(&self, path: &StorePath) -> Result<Box<dyn Read + Send>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.stat(path)?.is_dir() {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        let file = fs::File::open(self.full_path(path)).map_err(|e| io_error("read", path, e))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn mime_type(&self, path: &StorePath) -> Result<String, StoreError> {
        if self.stat(path)?.is_dir() {
            return Ok(DIRECTORY_MIME.to_owned());
        }
        Ok(mime_guess::from_path(self.full_path(path))
            .first_or_octet_stream()
            .essence_str()
            .to_owned())
    }
}

impl StoreWrite for LocalBackend {
    fn write(&self, path: &StorePath, data: &[u8]) -> Result<(), StoreError> {
        let (full, is_new) = self.prepare_write(path)?;
        fs::write(&full, data).map_err(|e| io_error("write", path, e))?;
        self.finish_write(path, is_new)
    }

    fn write_stream(&self, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError> {
        let (full, is_new) = self.prepare_write(path)?;
        let mut file = fs::File::create(&full).map_err(|e| io_error("write", path, e))?;
        io::copy(reader, &mut file).map_err(|e| io_error("write", path, e))?;
        self.finish_write(path, is_new)
    }

    fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        ensure_not_root(path, "delete")?;
        let full = self.full_path(path);
        let meta = fs::symlink_metadata(&full).map_err(|e| io_error("delete", path, e))?;
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        };
        removed.map_err(|e| io_error("delete", path, e))?;
        debug!(%path, "deleted");
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "move")?;
        self.stat(from)?;
        if let Some(parent) = to.parent() {
            self.mkdir(&parent)?;
        }
        fs::rename(self.full_path(from), self.full_path(to))
            .map_err(|e| io_error("move", from, e))
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "copy")?;
        if !self.stat(from)?.is_dir() {
            if let Some(parent) = to.parent() {
                self.mkdir(&parent)?;
            }
            return self.copy_file(from, to);
        }
        let tree = walk_all(from, |dir| self.list_children(dir))?;
        self.mkdir(to)?;
        for entry in tree {
            let Some(rel) = entry.path.strip_prefix(from) else {
                continue;
            };
            let target = to.join_path(&rel);
            if entry.is_dir() {
                self.mkdir(&target)?;
            } else {
                self.copy_file(&entry.path, &target)?;
            }
        }
        Ok(())
    }
}

impl StoreDir for LocalBackend {
    fn list_children(&self, path: &StorePath) -> Result<Vec<Entry>, StoreError> {
        if !self.stat(path)?.is_dir() {
            return Err(StoreError::NotADirectory { path: path.clone() });
        }
        let dir = fs::read_dir(self.full_path(path)).map_err(|e| io_error("list", path, e))?;
        let mut entries = Vec::new();
        for item in dir {
            let item = item.map_err(|e| io_error("list", path, e))?;
            let Ok(name) = item.file_name().into_string() else {
                warn!(dir = %path, "skipping entry with a non UTF-8 name");
                continue;
            };
            let child = path.join(&name)?;
            // Follows symlinks; dangling links are skipped.
            match fs::metadata(item.path()) {
                Ok(meta) => entries.push(Self::entry_from(child, &meta)),
                Err(e) => warn!(path = %child, error = %e, "skipping unreadable entry"),
            }
        }
        Ok(entries)
    }

    fn mkdir(&self, path: &StorePath) -> Result<(), StoreError> {
        let segments = path.segments();
        for depth in 1..=segments.len() {
            let prefix = StorePath::from_segments(&segments[..depth])?;
            let full = self.full_path(&prefix);
            match fs::metadata(&full) {
                Ok(meta) if meta.is_dir() => continue,
                Ok(_) => return Err(StoreError::NotADirectory { path: prefix }),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::backend("mkdir", &prefix, e)),
            }
            match fs::create_dir(&full) {
                Ok(()) => self.apply_access(&prefix, FileType::Directory, self.default_access)?,
                // Lost a race with another writer.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(StoreError::backend("mkdir", &prefix, e)),
            }
        }
        Ok(())
    }
}

impl StoreAccess for LocalBackend {
    fn access(&self, path: &StorePath) -> Result<Access, StoreError> {
        Ok(access_of(&self.stat(path)?))
    }

    fn set_access(&self, path: &StorePath, access: Access) -> Result<(), StoreError> {
        ensure_not_root(path, "set_access")?;
        let file_type = if self.stat(path)?.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        self.apply_access(path, file_type, access)
    }
}

impl StoreLocation for LocalBackend {
    fn location(&self, path: &StorePath) -> String {
        self.full_path(path).display().to_string()
    }

    fn url(&self, path: &StorePath) -> Option<String> {
        self.base_url.as_deref().map(|base| join_url(base, path))
    }
}

#[cfg(unix)]
fn access_of(meta: &fs::Metadata) -> Access {
    use std::os::unix::fs::PermissionsExt;
    AccessModes::access_of(meta.permissions().mode())
}

#[cfg(not(unix))]
fn access_of(meta: &fs::Metadata) -> Access {
    Access::from(!meta.permissions().readonly())
}

#[cfg(unix)]
fn set_access_bits(full: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(full, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_access_bits(full: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(full)?.permissions();
    perms.set_readonly(AccessModes::access_of(mode) == Access::Private);
    fs::set_permissions(full, perms)
}
