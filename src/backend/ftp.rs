//! FTP backend over a single `suppaftp` control connection.

use std::io::Read;
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::time::{Duration, UNIX_EPOCH};

use parking_lot::Mutex;
use suppaftp::list::File as ListEntry;
use suppaftp::types::FileType as TransferType;
use suppaftp::{FtpError, FtpStream, Mode};
use tracing::debug;

use super::remote::{access_from_listing, format_mode, is_missing_reply, remote_path};
use super::{ensure_not_root, ensure_transfer};
use crate::traits::{DIRECTORY_MIME, join_url};
use crate::walk::{removal_order, walk_all};
use crate::{
    Access, AccessModes, Entry, FileType, StoreAccess, StoreDir, StoreError, StoreLocation,
    StorePath, StoreRead, StoreWrite,
};

/// Settings for an [`FtpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FtpConfig {
    /// Server host name or address.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Remote directory store paths are resolved against.
    pub root: String,
    /// Use passive data connections.
    pub passive: bool,
    /// Connect and I/O timeout.
    pub timeout: Duration,
    /// Access given to newly created entries.
    pub default_access: Access,
    /// Mode bits used to express access.
    pub modes: AccessModes,
    /// Base URL for [`StoreLocation::url`].
    pub base_url: Option<String>,
}

impl FtpConfig {
    /// Defaults for `host` with anonymous login.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Log in as `username`.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Resolve store paths under `root`.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 21,
            username: "anonymous".to_owned(),
            password: String::new(),
            root: String::new(),
            passive: true,
            timeout: Duration::from_secs(30),
            default_access: Access::Public,
            modes: AccessModes::default(),
            base_url: None,
        }
    }
}

/// Backend storing entries on an FTP server.
///
/// The connection is opened and authenticated once in [`FtpBackend::connect`]
/// and shared by all calls; a dropped connection is not re-established.
pub struct FtpBackend {
    session: Mutex<FtpStream>,
    authority: String,
    root: String,
    default_access: Access,
    modes: AccessModes,
    base_url: Option<String>,
}

fn ftp_error(operation: &'static str, path: &StorePath) -> impl Fn(FtpError) -> StoreError {
    move |e| StoreError::backend(operation, path, e)
}

impl FtpBackend {
    /// Connect, log in and switch to binary transfers.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the host cannot be reached or the
    ///   login is rejected
    pub fn connect(config: FtpConfig) -> Result<Self, StoreError> {
        let authority = format!("{}:{}", config.host, config.port);
        let addr = authority
            .to_socket_addrs()
            .map_err(|e| StoreError::config_with(format!("cannot resolve {authority}"), e))?
            .next()
            .ok_or_else(|| StoreError::config(format!("no address for {authority}")))?;
        let mut ftp = FtpStream::connect_timeout(addr, config.timeout)
            .map_err(|e| StoreError::config_with(format!("cannot connect to {authority}"), e))?;
        ftp.login(&config.username, &config.password)
            .map_err(|e| StoreError::config_with(format!("login to {authority} rejected"), e))?;
        ftp.transfer_type(TransferType::Binary)
            .map_err(|e| StoreError::config_with("cannot switch to binary mode", e))?;
        ftp.set_mode(if config.passive {
            Mode::Passive
        } else {
            Mode::Active
        });
        debug!(%authority, root = %config.root, "connected ftp backend");
        Ok(Self {
            session: Mutex::new(ftp),
            authority,
            root: config.root,
            default_access: config.default_access,
            modes: config.modes,
            base_url: config.base_url,
        })
    }

    fn remote(&self, path: &StorePath) -> String {
        remote_path(&self.root, path)
    }

    /// Stat through a `LIST` of the parent directory.
    fn stat(&self, ftp: &mut FtpStream, path: &StorePath) -> Result<Option<Entry>, StoreError> {
        let Some(parent) = path.parent() else {
            return Ok(Some(Entry::root()));
        };
        let name = path.basename().unwrap_or_default();
        let listing = self.list_reply(ftp, &parent)?;
        let Some(mut entry) = stat_from_listing(&parent, name, listing)? else {
            return Ok(None);
        };
        if entry.is_file() {
            if let Ok(time) = ftp.mdtm(&self.remote(path)) {
                let secs = time.and_utc().timestamp();
                entry.modified = UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64);
            }
        }
        Ok(Some(entry))
    }

    fn require(&self, ftp: &mut FtpStream, path: &StorePath) -> Result<Entry, StoreError> {
        self.stat(ftp, path)?
            .ok_or_else(|| StoreError::NotFound { path: path.clone() })
    }

    /// Raw `LIST` lines of `dir`, or `None` when the server reports it missing.
    fn list_reply(
        &self,
        ftp: &mut FtpStream,
        dir: &StorePath,
    ) -> Result<Option<Vec<String>>, StoreError> {
        match ftp.list(Some(&self.remote(dir))) {
            Ok(lines) => Ok(Some(lines)),
            Err(FtpError::UnexpectedResponse(reply)) if is_missing_reply(reply.status.code()) => {
                debug!(%dir, code = reply.status.code(), "list reports missing directory");
                Ok(None)
            }
            Err(e) => Err(StoreError::backend("list", dir, e)),
        }
    }

    fn children(&self, ftp: &mut FtpStream, dir: &StorePath) -> Result<Vec<Entry>, StoreError> {
        let lines = ftp
            .list(Some(&self.remote(dir)))
            .map_err(ftp_error("list", dir))?;
        listing_entries(dir, lines)
    }

    fn chmod(
        &self,
        ftp: &mut FtpStream,
        path: &StorePath,
        file_type: FileType,
        access: Access,
    ) -> Result<(), StoreError> {
        let mode = format_mode(self.modes.mode_for(file_type, access));
        ftp.site(format!("CHMOD {mode} {}", self.remote(path)))
            .map_err(ftp_error("set_access", path))?;
        Ok(())
    }

    fn make_dirs(&self, ftp: &mut FtpStream, path: &StorePath) -> Result<(), StoreError> {
        let segments = path.segments();
        for depth in 1..=segments.len() {
            let prefix = StorePath::from_segments(&segments[..depth])?;
            match self.stat(ftp, &prefix)? {
                Some(e) if e.is_dir() => continue,
                Some(_) => return Err(StoreError::NotADirectory { path: prefix }),
                None => {}
            }
            ftp.mkdir(&self.remote(&prefix))
                .map_err(ftp_error("mkdir", &prefix))?;
            self.chmod(ftp, &prefix, FileType::Directory, self.default_access)?;
        }
        Ok(())
    }

    fn put(
        &self,
        ftp: &mut FtpStream,
        path: &StorePath,
        mut reader: &mut dyn Read,
    ) -> Result<(), StoreError> {
        ensure_not_root(path, "write")?;
        let is_new = match self.stat(ftp, path)? {
            Some(e) if e.is_dir() => return Err(StoreError::NotAFile { path: path.clone() }),
            Some(_) => false,
            None => true,
        };
        if let Some(parent) = path.parent() {
            self.make_dirs(ftp, &parent)?;
        }
        ftp.put_file(&self.remote(path), &mut reader)
            .map_err(ftp_error("write", path))?;
        if is_new {
            self.chmod(ftp, path, FileType::File, self.default_access)?;
        }
        Ok(())
    }

    fn fetch(&self, ftp: &mut FtpStream, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.require(ftp, path)?.is_dir() {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        let cursor = ftp
            .retr_as_buffer(&self.remote(path))
            .map_err(ftp_error("read", path))?;
        Ok(cursor.into_inner())
    }

    fn remove_tree(&self, ftp: &mut FtpStream, path: &StorePath) -> Result<(), StoreError> {
        let tree = walk_all(path, |dir| self.children(ftp, dir))?;
        let (files, dirs) = removal_order(tree);
        for file in files {
            ftp.rm(&self.remote(&file)).map_err(ftp_error("delete", &file))?;
        }
        for dir in dirs {
            ftp.rmdir(&self.remote(&dir)).map_err(ftp_error("delete", &dir))?;
        }
        ftp.rmdir(&self.remote(path)).map_err(ftp_error("delete", path))
    }
}

/// Entries of a `LIST` reply for `dir`. Unparseable lines are skipped.
fn listing_entries(dir: &StorePath, lines: Vec<String>) -> Result<Vec<Entry>, StoreError> {
    let mut entries = Vec::new();
    for line in lines {
        let Ok(file) = ListEntry::from_str(&line) else {
            continue;
        };
        let name = file.name();
        if matches!(name, "." | "..") {
            continue;
        }
        let is_dir = file.is_directory();
        entries.push(Entry {
            path: dir.join(name)?,
            file_type: if is_dir {
                FileType::Directory
            } else {
                FileType::File
            },
            size: if is_dir { 0 } else { file.size() as u64 },
            modified: file.modified(),
            access: access_from_listing(&line).unwrap_or_default(),
        });
    }
    Ok(entries)
}

/// Stat `name` from the `LIST` reply of its parent `dir`.
///
/// A parent the server reported missing (`None`) means the entry is absent.
fn stat_from_listing(
    dir: &StorePath,
    name: &str,
    listing: Option<Vec<String>>,
) -> Result<Option<Entry>, StoreError> {
    let Some(lines) = listing else {
        return Ok(None);
    };
    Ok(listing_entries(dir, lines)?
        .into_iter()
        .find(|e| e.name() == name))
}

impl StoreRead for FtpBackend {
    fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        Ok(self.stat(&mut self.session.lock(), path)?.is_some())
    }

    fn metadata(&self, path: &StorePath) -> Result<Entry, StoreError> {
        self.require(&mut self.session.lock(), path)
    }

    fn read(&self, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        self.fetch(&mut self.session.lock(), path)
    }

    fn read_stream(&self, path: &StorePath) -> Result<Box<dyn Read + Send>, StoreError> {
        let data = self.fetch(&mut self.session.lock(), path)?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }

    fn mime_type(&self, path: &StorePath) -> Result<String, StoreError> {
        if self.require(&mut self.session.lock(), path)?.is_dir() {
            return Ok(DIRECTORY_MIME.to_owned());
        }
        Ok(mime_guess::from_path(path.to_string())
            .first_or_octet_stream()
            .essence_str()
            .to_owned())
    }
}

impl StoreWrite for FtpBackend {
    fn write(&self, path: &StorePath, data: &[u8]) -> Result<(), StoreError> {
        self.put(&mut self.session.lock(), path, &mut &data[..])
    }

    fn write_stream(&self, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError> {
        self.put(&mut self.session.lock(), path, reader)
    }

    fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        ensure_not_root(path, "delete")?;
        let mut ftp = self.session.lock();
        if self.require(&mut ftp, path)?.is_dir() {
            self.remove_tree(&mut ftp, path)?;
        } else {
            ftp.rm(&self.remote(path)).map_err(ftp_error("delete", path))?;
        }
        debug!(%path, "deleted");
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "move")?;
        let mut ftp = self.session.lock();
        self.require(&mut ftp, from)?;
        if let Some(parent) = to.parent() {
            self.make_dirs(&mut ftp, &parent)?;
        }
        ftp.rename(&self.remote(from), &self.remote(to))
            .map_err(ftp_error("move", from))
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "copy")?;
        let mut ftp = self.session.lock();
        if !self.require(&mut ftp, from)?.is_dir() {
            let data = self.fetch(&mut ftp, from)?;
            return self.put(&mut ftp, to, &mut &data[..]);
        }
        let tree = walk_all(from, |dir| self.children(&mut ftp, dir))?;
        self.make_dirs(&mut ftp, to)?;
        for entry in tree {
            let Some(rel) = entry.path.strip_prefix(from) else {
                continue;
            };
            let target = to.join_path(&rel);
            if entry.is_dir() {
                self.make_dirs(&mut ftp, &target)?;
            } else {
                let data = self.fetch(&mut ftp, &entry.path)?;
                self.put(&mut ftp, &target, &mut &data[..])?;
            }
        }
        Ok(())
    }
}

impl StoreDir for FtpBackend {
    fn list_children(&self, path: &StorePath) -> Result<Vec<Entry>, StoreError> {
        let mut ftp = self.session.lock();
        if !self.require(&mut ftp, path)?.is_dir() {
            return Err(StoreError::NotADirectory { path: path.clone() });
        }
        self.children(&mut ftp, path)
    }

    fn mkdir(&self, path: &StorePath) -> Result<(), StoreError> {
        self.make_dirs(&mut self.session.lock(), path)
    }
}

impl StoreAccess for FtpBackend {
    fn access(&self, path: &StorePath) -> Result<Access, StoreError> {
        Ok(self.require(&mut self.session.lock(), path)?.access)
    }

    fn set_access(&self, path: &StorePath, access: Access) -> Result<(), StoreError> {
        ensure_not_root(path, "set_access")?;
        let mut ftp = self.session.lock();
        let entry = self.require(&mut ftp, path)?;
        self.chmod(&mut ftp, path, entry.file_type, access)
    }
}

impl StoreLocation for FtpBackend {
    fn location(&self, path: &StorePath) -> String {
        format!(
            "ftp://{}/{}",
            self.authority,
            self.remote(path).trim_start_matches('/')
        )
    }

    fn url(&self, path: &StorePath) -> Option<String> {
        self.base_url.as_deref().map(|base| join_url(base, path))
    }
}

impl std::fmt::Debug for FtpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpBackend")
            .field("authority", &self.authority)
            .field("root", &self.root)
            .field("default_access", &self.default_access)
            .finish_non_exhaustive()
    }
}

impl Drop for FtpBackend {
    fn drop(&mut self) {
        if let Err(e) = self.session.get_mut().quit() {
            debug!(authority = %self.authority, error = %e, "ftp quit failed");
        }
    }
}
