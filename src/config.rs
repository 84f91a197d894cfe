//! Declarative backend configuration.

use std::sync::Arc;

#[cfg(feature = "ftp")]
use crate::backend::{FtpBackend, FtpConfig};
#[cfg(feature = "sftp")]
use crate::backend::{SftpBackend, SftpConfig};
use crate::backend::{AdapterBackend, LocalBackend, LocalConfig, MemoryAdapter};
use crate::{Access, StoreBackend, StoreError, StorePath};

/// Settings for any built-in backend.
///
/// With the `serde` feature the enum is internally tagged by `type`:
///
/// ```json
/// { "type": "local", "root": "/srv/files", "base_url": "https://cdn.example.org" }
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum BackendConfig {
    /// A directory on local disk.
    Local(LocalConfig),

    /// A fresh in-process [`MemoryAdapter`].
    Memory {
        /// Prefix applied inside the adapter.
        #[cfg_attr(feature = "serde", serde(default))]
        prefix: Option<String>,
        /// Access given to newly created entries.
        #[cfg_attr(feature = "serde", serde(default))]
        default_access: Access,
        /// Base URL for [`StoreLocation::url`](crate::StoreLocation::url).
        #[cfg_attr(feature = "serde", serde(default))]
        base_url: Option<String>,
    },

    /// An FTP server.
    #[cfg(feature = "ftp")]
    Ftp(FtpConfig),

    /// An SFTP server.
    #[cfg(feature = "sftp")]
    Sftp(SftpConfig),
}

impl BackendConfig {
    /// Open the configured backend.
    ///
    /// Remote backends connect and authenticate here.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the backend cannot be opened
    /// - [`StoreError::InvalidPath`] if a memory prefix does not normalize
    pub fn open(&self) -> Result<Arc<dyn StoreBackend>, StoreError> {
        Ok(match self {
            Self::Local(config) => Arc::new(LocalBackend::new(config.clone())?),
            Self::Memory {
                prefix,
                default_access,
                base_url,
            } => {
                let mut backend = AdapterBackend::new(Arc::new(MemoryAdapter::new()))
                    .with_default_access(*default_access);
                if let Some(prefix) = prefix {
                    backend = backend.with_prefix(StorePath::parse(prefix)?);
                }
                if let Some(base_url) = base_url {
                    backend = backend.with_base_url(base_url.clone());
                }
                Arc::new(backend)
            }
            #[cfg(feature = "ftp")]
            Self::Ftp(config) => Arc::new(FtpBackend::connect(config.clone())?),
            #[cfg(feature = "sftp")]
            Self::Sftp(config) => Arc::new(SftpBackend::connect(config.clone())?),
        })
    }

    /// Parse settings from JSON.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the JSON does not describe a backend
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::config_with("invalid backend configuration", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreExt;

    #[test]
    fn open_memory_backend() {
        let backend = BackendConfig::Memory {
            prefix: Some("site".into()),
            default_access: Access::Private,
            base_url: None,
        }
        .open()
        .unwrap();
        let path = StorePath::parse("a.txt").unwrap();
        backend.write(&path, b"abc").unwrap();
        assert_eq!(backend.size(&path).unwrap(), 3);
        assert_eq!(backend.access(&path).unwrap(), Access::Private);
        assert_eq!(backend.location(&path), "site/a.txt");
    }

    #[test]
    fn open_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = BackendConfig::Local(LocalConfig::new(dir.path())).open().unwrap();
        assert!(backend.is_dir(&StorePath::root()).unwrap());
    }

    #[test]
    fn open_missing_local_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = BackendConfig::Local(LocalConfig::new(dir.path().join("nope")))
            .open()
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigError);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_json_local() {
        let config = BackendConfig::from_json(
            r#"{ "type": "local", "root": "/srv/files", "base_url": "https://cdn.test" }"#,
        )
        .unwrap();
        let BackendConfig::Local(local) = config else {
            panic!("expected local config");
        };
        assert_eq!(local.root, std::path::PathBuf::from("/srv/files"));
        assert_eq!(local.base_url.as_deref(), Some("https://cdn.test"));
        assert_eq!(local.default_access, Access::Public);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn from_json_rejects_unknown_type() {
        let err = BackendConfig::from_json(r#"{ "type": "s3" }"#).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigError);
    }
}
