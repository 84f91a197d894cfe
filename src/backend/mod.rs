//! # Backends
//!
//! Concrete implementations of the storage traits.
//!
//! | Backend | Transport | Feature |
//! |---------|-----------|---------|
//! | [`LocalBackend`] | `std::fs` | always |
//! | [`AdapterBackend`] | any [`Adapter`] | always |
//! | `FtpBackend` | `suppaftp` | `ftp` |
//! | `SftpBackend` | `ssh2` | `sftp` |
//!
//! Every backend checks its preconditions in the same order before touching
//! the transport: root path, then source/destination identity, then existence.

mod adapter;
mod local;
pub mod remote;

#[cfg(feature = "ftp")]
mod ftp;
#[cfg(feature = "sftp")]
mod sftp;

pub use adapter::{Adapter, AdapterBackend, AdapterEntry, AdapterError, MemoryAdapter, Visibility};
pub use local::{LocalBackend, LocalConfig};

#[cfg(feature = "ftp")]
pub use ftp::{FtpBackend, FtpConfig};
#[cfg(feature = "sftp")]
pub use sftp::{SftpAuth, SftpBackend, SftpConfig};

use crate::{StoreError, StorePath};

/// Fail with [`StoreError::RootPathForbidden`] if `path` is the root.
pub(crate) fn ensure_not_root(path: &StorePath, operation: &'static str) -> Result<(), StoreError> {
    if path.is_root() {
        Err(StoreError::RootPathForbidden { operation })
    } else {
        Ok(())
    }
}

/// Checks shared by move and copy: neither side is the root, they differ, and
/// the destination is not inside the source.
pub(crate) fn ensure_transfer(
    from: &StorePath,
    to: &StorePath,
    operation: &'static str,
) -> Result<(), StoreError> {
    ensure_not_root(from, operation)?;
    ensure_not_root(to, operation)?;
    if from == to {
        return Err(StoreError::SameSource { path: from.clone() });
    }
    if to.starts_with(from) {
        return Err(StoreError::InvalidPath {
            path: to.to_string(),
            reason: "destination is inside the source",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_rejected_first() {
        let root = StorePath::root();
        let err = ensure_transfer(&root, &root, "move").unwrap_err();
        assert!(matches!(err, StoreError::RootPathForbidden { operation: "move" }));
    }

    #[test]
    fn same_source_is_rejected() {
        let a = StorePath::parse("a").unwrap();
        let err = ensure_transfer(&a, &a, "copy").unwrap_err();
        assert!(matches!(err, StoreError::SameSource { .. }));
    }

    #[test]
    fn nested_destination_is_rejected() {
        let a = StorePath::parse("a").unwrap();
        let inner = StorePath::parse("a/b").unwrap();
        let err = ensure_transfer(&a, &inner, "copy").unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath { .. }));
        assert!(ensure_transfer(&inner, &a, "move").is_ok());
    }

    #[test]
    fn distinct_paths_pass() {
        let a = StorePath::parse("a").unwrap();
        let b = StorePath::parse("b").unwrap();
        assert!(ensure_transfer(&a, &b, "move").is_ok());
    }
}
