//! SFTP backend over an `ssh2` session.

use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use ssh2::{ErrorCode, FileStat, Session, Sftp};
use tracing::debug;

use super::remote::remote_path;
use super::{ensure_not_root, ensure_transfer};
use crate::traits::{DIRECTORY_MIME, join_url};
use crate::walk::{removal_order, walk_all};
use crate::{
    Access, AccessModes, Entry, FileType, StoreAccess, StoreDir, StoreError, StoreLocation,
    StorePath, StoreRead, StoreWrite,
};

/// `SSH_FX_NO_SUCH_FILE` and `SSH_FX_NO_SUCH_PATH`.
const NO_SUCH_FILE: [i32; 2] = [2, 10];

/// How an [`SftpBackend`] authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SftpAuth {
    /// Password login.
    Password(String),
    /// Private key file, optionally encrypted.
    PrivateKey {
        /// Key file on the local machine.
        path: PathBuf,
        /// Passphrase of the key.
        passphrase: Option<String>,
    },
    /// Keys offered by a running SSH agent.
    Agent,
}

/// Settings for an [`SftpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SftpConfig {
    /// Server host name or address.
    pub host: String,
    /// SSH port.
    #[cfg_attr(feature = "serde", serde(default = "default_port"))]
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Authentication method.
    pub auth: SftpAuth,
    /// Remote directory store paths are resolved against.
    #[cfg_attr(feature = "serde", serde(default))]
    pub root: String,
    /// Connect and I/O timeout.
    #[cfg_attr(feature = "serde", serde(default = "default_timeout"))]
    pub timeout: Duration,
    /// Access given to newly created entries.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_access: Access,
    /// Mode bits used to express access.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modes: AccessModes,
    /// Base URL for [`StoreLocation::url`].
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_url: Option<String>,
}

#[cfg(feature = "serde")]
fn default_port() -> u16 {
    22
}

#[cfg(feature = "serde")]
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl SftpConfig {
    /// Settings for `username@host` with the given authentication.
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: SftpAuth) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth,
            root: String::new(),
            timeout: Duration::from_secs(30),
            default_access: Access::Public,
            modes: AccessModes::default(),
            base_url: None,
        }
    }

    /// Resolve store paths under `root`.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }
}

struct SftpSession {
    // Field order matters: the channel must close before its session.
    sftp: Sftp,
    _session: Session,
}

/// Backend storing entries on an SFTP server.
pub struct SftpBackend {
    session: Mutex<SftpSession>,
    authority: String,
    root: String,
    default_access: Access,
    modes: AccessModes,
    base_url: Option<String>,
}

fn sftp_error(operation: &'static str, path: &StorePath) -> impl Fn(ssh2::Error) -> StoreError {
    move |e| {
        if is_missing(&e) {
            StoreError::NotFound { path: path.clone() }
        } else {
            StoreError::backend(operation, path, e)
        }
    }
}

fn is_missing(error: &ssh2::Error) -> bool {
    matches!(error.code(), ErrorCode::SFTP(code) if NO_SUCH_FILE.contains(&code))
}

fn file_type_of(stat: &FileStat) -> FileType {
    if stat.is_dir() {
        FileType::Directory
    } else {
        FileType::File
    }
}

impl SftpBackend {
    /// Connect, handshake, authenticate and open the SFTP channel.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if any of those steps fails
    pub fn connect(config: SftpConfig) -> Result<Self, StoreError> {
        let authority = format!("{}:{}", config.host, config.port);
        let addr = authority
            .to_socket_addrs()
            .map_err(|e| StoreError::config_with(format!("cannot resolve {authority}"), e))?
            .next()
            .ok_or_else(|| StoreError::config(format!("no address for {authority}")))?;
        let tcp = TcpStream::connect_timeout(&addr, config.timeout)
            .map_err(|e| StoreError::config_with(format!("cannot connect to {authority}"), e))?;
        let mut session =
            Session::new().map_err(|e| StoreError::config_with("cannot create ssh session", e))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(u32::try_from(config.timeout.as_millis()).unwrap_or(u32::MAX));
        session
            .handshake()
            .map_err(|e| StoreError::config_with(format!("ssh handshake with {authority} failed"), e))?;
        let user = config.username.as_str();
        let auth = match &config.auth {
            SftpAuth::Password(password) => session.userauth_password(user, password),
            SftpAuth::PrivateKey { path, passphrase } => {
                session.userauth_pubkey_file(user, None, path, passphrase.as_deref())
            }
            SftpAuth::Agent => session.userauth_agent(user),
        };
        auth.map_err(|e| StoreError::config_with(format!("login to {authority} rejected"), e))?;
        let sftp = session
            .sftp()
            .map_err(|e| StoreError::config_with("cannot open sftp channel", e))?;
        debug!(%authority, root = %config.root, "connected sftp backend");
        Ok(Self {
            session: Mutex::new(SftpSession {
                sftp,
                _session: session,
            }),
            authority,
            root: config.root,
            default_access: config.default_access,
            modes: config.modes,
            base_url: config.base_url,
        })
    }

    fn remote(&self, path: &StorePath) -> PathBuf {
        PathBuf::from(remote_path(&self.root, path))
    }

    fn entry_from(path: StorePath, stat: &FileStat) -> Entry {
        let file_type = file_type_of(stat);
        Entry {
            path,
            file_type,
            size: match file_type {
                FileType::File => stat.size.unwrap_or(0),
                FileType::Directory => 0,
            },
            modified: stat
                .mtime
                .map_or(SystemTime::UNIX_EPOCH, |secs| UNIX_EPOCH + Duration::from_secs(secs)),
            access: stat.perm.map(AccessModes::access_of).unwrap_or_default(),
        }
    }

    fn stat(&self, sftp: &Sftp, path: &StorePath) -> Result<Option<FileStat>, StoreError> {
        match sftp.stat(&self.remote(path)) {
            Ok(stat) => Ok(Some(stat)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(StoreError::backend("stat", path, e)),
        }
    }

    fn require(&self, sftp: &Sftp, path: &StorePath) -> Result<FileStat, StoreError> {
        self.stat(sftp, path)?
            .ok_or_else(|| StoreError::NotFound { path: path.clone() })
    }

    fn children(&self, sftp: &Sftp, dir: &StorePath) -> Result<Vec<Entry>, StoreError> {
        let rows = sftp
            .readdir(&self.remote(dir))
            .map_err(sftp_error("list", dir))?;
        let mut entries = Vec::with_capacity(rows.len());
        for (remote, stat) in rows {
            let Some(name) = remote.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if matches!(name, "." | "..") {
                continue;
            }
            entries.push(Self::entry_from(dir.join(name)?, &stat));
        }
        Ok(entries)
    }

    fn chmod(
        &self,
        sftp: &Sftp,
        path: &StorePath,
        file_type: FileType,
        access: Access,
    ) -> Result<(), StoreError> {
        let stat = FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(self.modes.mode_for(file_type, access)),
            atime: None,
            mtime: None,
        };
        sftp.setstat(&self.remote(path), stat)
            .map_err(sftp_error("set_access", path))
    }

    fn make_dirs(&self, sftp: &Sftp, path: &StorePath) -> Result<(), StoreError> {
        let segments = path.segments();
        for depth in 1..=segments.len() {
            let prefix = StorePath::from_segments(&segments[..depth])?;
            match self.stat(sftp, &prefix)? {
                Some(stat) if stat.is_dir() => continue,
                Some(_) => return Err(StoreError::NotADirectory { path: prefix }),
                None => {}
            }
            let mode = self.modes.mode_for(FileType::Directory, self.default_access);
            sftp.mkdir(&self.remote(&prefix), mode as i32)
                .map_err(sftp_error("mkdir", &prefix))?;
            self.chmod(sftp, &prefix, FileType::Directory, self.default_access)?;
        }
        Ok(())
    }

    fn put(&self, sftp: &Sftp, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError> {
        ensure_not_root(path, "write")?;
        let is_new = match self.stat(sftp, path)? {
            Some(stat) if stat.is_dir() => {
                return Err(StoreError::NotAFile { path: path.clone() });
            }
            Some(_) => false,
            None => true,
        };
        if let Some(parent) = path.parent() {
            self.make_dirs(sftp, &parent)?;
        }
        let mut file = sftp
            .create(&self.remote(path))
            .map_err(sftp_error("write", path))?;
        io::copy(reader, &mut file).map_err(|e| StoreError::backend("write", path, e))?;
        drop(file);
        if is_new {
            self.chmod(sftp, path, FileType::File, self.default_access)?;
        }
        Ok(())
    }

    fn fetch(&self, sftp: &Sftp, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        ensure_not_root(path, "read")?;
        if self.require(sftp, path)?.is_dir() {
            return Err(StoreError::NotAFile { path: path.clone() });
        }
        let mut file = sftp
            .open(&self.remote(path))
            .map_err(sftp_error("read", path))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| StoreError::backend("read", path, e))?;
        Ok(data)
    }

    fn remove_tree(&self, sftp: &Sftp, path: &StorePath) -> Result<(), StoreError> {
        let tree = walk_all(path, |dir| self.children(sftp, dir))?;
        let (files, dirs) = removal_order(tree);
        for file in files {
            sftp.unlink(&self.remote(&file))
                .map_err(sftp_error("delete", &file))?;
        }
        for dir in dirs {
            sftp.rmdir(&self.remote(&dir)).map_err(sftp_error("delete", &dir))?;
        }
        sftp.rmdir(&self.remote(path)).map_err(sftp_error("delete", path))
    }
}

impl StoreRead for SftpBackend {
    fn exists(&self, path: &StorePath) -> Result<bool, StoreError> {
        Ok(self.stat(&self.session.lock().sftp, path)?.is_some())
    }

    fn metadata(&self, path: &StorePath) -> Result<Entry, StoreError> {
        if path.is_root() {
            return Ok(Entry::root());
        }
        let stat = self.require(&self.session.lock().sftp, path)?;
        Ok(Self::entry_from(path.clone(), &stat))
    }

    fn read(&self, path: &StorePath) -> Result<Vec<u8>, StoreError> {
        self.fetch(&self.session.lock().sftp, path)
    }

    fn read_stream(&self, path: &StorePath) -> Result<Box<dyn Read + Send>, StoreError> {
        let data = self.fetch(&self.session.lock().sftp, path)?;
        Ok(Box::new(io::Cursor::new(data)))
    }

    fn mime_type(&self, path: &StorePath) -> Result<String, StoreError> {
        if self.require(&self.session.lock().sftp, path)?.is_dir() {
            return Ok(DIRECTORY_MIME.to_owned());
        }
        Ok(mime_guess::from_path(Path::new(&path.to_string()))
            .first_or_octet_stream()
            .essence_str()
            .to_owned())
    }
}

impl StoreWrite for SftpBackend {
    fn write(&self, path: &StorePath, data: &[u8]) -> Result<(), StoreError> {
        self.put(&self.session.lock().sftp, path, &mut &data[..])
    }

    fn write_stream(&self, path: &StorePath, reader: &mut dyn Read) -> Result<(), StoreError> {
        self.put(&self.session.lock().sftp, path, reader)
    }

    fn delete(&self, path: &StorePath) -> Result<(), StoreError> {
        ensure_not_root(path, "delete")?;
        let guard = self.session.lock();
        let sftp = &guard.sftp;
        if self.require(sftp, path)?.is_dir() {
            self.remove_tree(sftp, path)?;
        } else {
            sftp.unlink(&self.remote(path))
                .map_err(sftp_error("delete", path))?;
        }
        debug!(%path, "deleted");
        Ok(())
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "move")?;
        let guard = self.session.lock();
        let sftp = &guard.sftp;
        self.require(sftp, from)?;
        if let Some(parent) = to.parent() {
            self.make_dirs(sftp, &parent)?;
        }
        sftp.rename(&self.remote(from), &self.remote(to), None)
            .map_err(sftp_error("move", from))
    }

    fn copy(&self, from: &StorePath, to: &StorePath) -> Result<(), StoreError> {
        ensure_transfer(from, to, "copy")?;
        let guard = self.session.lock();
        let sftp = &guard.sftp;
        if !self.require(sftp, from)?.is_dir() {
            let data = self.fetch(sftp, from)?;
            return self.put(sftp, to, &mut &data[..]);
        }
        let tree = walk_all(from, |dir| self.children(sftp, dir))?;
        self.make_dirs(sftp, to)?;
        for entry in tree {
            let Some(rel) = entry.path.strip_prefix(from) else {
                continue;
            };
            let target = to.join_path(&rel);
            if entry.is_dir() {
                self.make_dirs(sftp, &target)?;
            } else {
                let data = self.fetch(sftp, &entry.path)?;
                self.put(sftp, &target, &mut &data[..])?;
            }
        }
        Ok(())
    }
}

impl StoreDir for SftpBackend {
    fn list_children(&self, path: &StorePath) -> Result<Vec<Entry>, StoreError> {
        let guard = self.session.lock();
        if !self.require(&guard.sftp, path)?.is_dir() {
            return Err(StoreError::NotADirectory { path: path.clone() });
        }
        self.children(&guard.sftp, path)
    }

    fn mkdir(&self, path: &StorePath) -> Result<(), StoreError> {
        self.make_dirs(&self.session.lock().sftp, path)
    }
}

impl StoreAccess for SftpBackend {
    fn access(&self, path: &StorePath) -> Result<Access, StoreError> {
        Ok(self.metadata(path)?.access)
    }

    fn set_access(&self, path: &StorePath, access: Access) -> Result<(), StoreError> {
        ensure_not_root(path, "set_access")?;
        let guard = self.session.lock();
        let stat = self.require(&guard.sftp, path)?;
        self.chmod(&guard.sftp, path, file_type_of(&stat), access)
    }
}

impl StoreLocation for SftpBackend {
    fn location(&self, path: &StorePath) -> String {
        format!(
            "sftp://{}/{}",
            self.authority,
            remote_path(&self.root, path).trim_start_matches('/')
        )
    }

    fn url(&self, path: &StorePath) -> Option<String> {
        self.base_url.as_deref().map(|base| join_url(base, path))
    }
}

impl std::fmt::Debug for SftpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpBackend")
            .field("authority", &self.authority)
            .field("root", &self.root)
            .field("default_access", &self.default_access)
            .finish_non_exhaustive()
    }
}
