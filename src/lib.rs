//! # anystore
//!
//! Pluggable file storage with a uniform API over local disk, FTP, SFTP and
//! third-party adapters, plus a thumbnail cache for derived images.
//!
//! ---
//!
//! ## Quick Start
//!
//! Open a backend, bind paths to it with [`FileHandle`], and work with the
//! handles:
//!
//! ```rust
//! use std::sync::Arc;
//! use anystore::{FileHandle, LocalBackend, StoreBackend};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let backend: Arc<dyn StoreBackend> = Arc::new(LocalBackend::open(dir.path())?);
//!
//! let report = FileHandle::parse(backend.clone(), "reports/2024/q1.txt")?;
//! report.put_contents("revenue up")?;
//! assert_eq!(report.size()?, 10);
//!
//! let copy = report.copy_to(&"archive/q1.txt".parse()?)?;
//! assert_eq!(copy.contents_string()?, "revenue up");
//! # Ok::<(), anystore::StoreError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`StorePath`] | Normalized, root-relative path |
//! | [`StoreBackend`] | Everything a backend implements |
//! | [`StoreExt`] | Convenience methods on every backend (`list`, `size`, ...) |
//! | [`FileHandle`] | A path bound to a shared backend |
//! | [`StoreError`] | Error type with the offending path attached |
//! | [`Entry`] | Metadata of a single entry |
//! | [`ListFilter`] | Criteria for [`StoreExt::list`] |
//! | [`Thumbnailer`] | Generates and caches thumbnails |
//!
//! ---
//!
//! ## Backends
//!
//! | Backend | Storage |
//! |---------|---------|
//! | [`LocalBackend`] | A directory on the local filesystem |
//! | [`AdapterBackend`] | Any [`Adapter`], e.g. the in-memory [`MemoryAdapter`] |
//! | `FtpBackend` | An FTP server (feature `ftp`) |
//! | `SftpBackend` | An SSH server's SFTP subsystem (feature `sftp`) |
//!
//! Backends can also be described declaratively with [`BackendConfig`].
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! StoreRead + StoreWrite + StoreDir + StoreAccess + StoreLocation = StoreBackend
//!                                                                      ↓
//!                                                       StoreExt (blanket)
//! ```
//!
//! [`StoreBackend`] has a blanket implementation. Implement the component
//! traits and the composite comes for free.
//!
//! ---
//!
//! ## Paths
//!
//! Every operation takes a [`StorePath`]: relative to the backend root,
//! `/`-separated, with `.` and `..` resolved. `..` never escapes the root.
//!
//! ```rust
//! use anystore::StorePath;
//!
//! let path = StorePath::parse("/dir/../dir/to/file")?;
//! assert_eq!(path.to_string(), "dir/to/file");
//! assert!(StorePath::parse("../..")?.is_root());
//! # Ok::<(), anystore::StoreError>(())
//! ```
//!
//! Content operations on the root fail with
//! [`StoreError::RootPathForbidden`].
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, StoreError>`. Errors name the path or
//! operation involved; transport failures keep their cause reachable through
//! [`std::error::Error::source`].
//!
//! ```rust
//! use anystore::{StoreError, StorePath};
//!
//! let err = StoreError::SameSource { path: StorePath::parse("a.txt").unwrap() };
//! assert_eq!(err.to_string(), "source and destination are the same: a.txt");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. Share a backend between
//! handles and threads with `Arc<dyn StoreBackend>`; remote backends serialize
//! access to their session internally.
//!
//! ---
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: `debug` for backend operations and
//! thumbnail pipeline steps, `warn` for entries skipped during listings and
//! cache clears. Install any subscriber to see them.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for configs and types, JSON helpers ([`StoreExtJson`]) |
//! | `ftp` | `FtpBackend` via `suppaftp` |
//! | `sftp` | `SftpBackend` via `ssh2` |

mod config;
mod error;
mod ext;
mod filter;
mod handle;
mod path;
mod storage_name;
mod thumb;
mod traits;
mod types;
mod upload;

pub mod backend;
pub mod walk;

// Public re-exports - errors
pub use error::{BoxError, ErrorKind, StoreError};

// Public re-exports - core types
pub use path::{SEPARATOR, StorePath};
pub use types::{Access, AccessModes, Entry, FileType, OTHER_READ};

// Public re-exports - traits
pub use traits::{
    DIRECTORY_MIME, StoreAccess, StoreBackend, StoreDir, StoreLocation, StoreRead, StoreWrite,
};

// Public re-exports - infrastructure
pub use ext::StoreExt;
pub use filter::ListFilter;
pub use handle::FileHandle;

// Public re-exports - backends
pub use backend::{
    Adapter, AdapterBackend, AdapterEntry, AdapterError, LocalBackend, LocalConfig, MemoryAdapter,
    Visibility,
};
pub use config::BackendConfig;

// Public re-exports - uploads
pub use storage_name::{FIELD_SEPARATOR, StorageName};
pub use upload::{UploadError, UploadRejected, UploadedFile};

// Public re-exports - thumbnails
pub use thumb::{
    DISCLAIMER_OFFSET, DISCLAIMER_OPACITY, PLACEHOLDER_DIR, ThumbFile, ThumbOutcome, ThumbSpec,
    ThumbnailConfig, Thumbnailer,
};

// Conditional re-exports
#[cfg(feature = "ftp")]
pub use backend::{FtpBackend, FtpConfig};
#[cfg(feature = "serde")]
pub use ext::StoreExtJson;
#[cfg(feature = "sftp")]
pub use backend::{SftpAuth, SftpBackend, SftpConfig};
