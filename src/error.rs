//! Error types for the storage layer.

use std::error::Error as StdError;

use crate::StorePath;

/// Boxed cause carried by transport and pipeline errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Storage error with contextual variants.
///
/// Every variant names the offending path (or operation) so callers never have
/// to guess which entry failed. Transport failures keep their underlying cause
/// reachable through [`std::error::Error::source`].
///
/// # Examples
///
/// ```rust
/// use anystore::{ErrorKind, StoreError, StorePath};
///
/// let err = StoreError::NotFound { path: StorePath::parse("docs/missing.txt").unwrap() };
/// assert_eq!(err.kind(), ErrorKind::NotFound);
/// assert_eq!(err.to_string(), "not found: docs/missing.txt");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Path input could not be normalized.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The raw input that was rejected.
        path: String,
        /// Why the input was rejected.
        reason: &'static str,
    },

    /// Content operation attempted on the root directory.
    #[error("{operation}: not allowed on the root path")]
    RootPathForbidden {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: StorePath,
    },

    /// Move or copy onto itself.
    #[error("source and destination are the same: {path}")]
    SameSource {
        /// The path used as both source and destination.
        path: StorePath,
    },

    /// Expected a directory but found a file.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: StorePath,
    },

    /// Expected a file but found a directory.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: StorePath,
    },

    /// Transport, authentication or I/O failure.
    #[error("{operation} failed for {path}: {source}")]
    BackendFailure {
        /// The path involved in the operation.
        path: StorePath,
        /// The operation that failed.
        operation: &'static str,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },

    /// Thumbnail source could not be decoded as an image.
    #[error("source unreadable: {path}: {source}")]
    SourceUnreadable {
        /// The source path.
        path: StorePath,
        /// The decoder error.
        #[source]
        source: BoxError,
    },

    /// A thumbnail pipeline step after decoding failed.
    #[error("thumbnail {stage} failed for {path}: {source}")]
    TransformFailed {
        /// The source path being processed.
        path: StorePath,
        /// Pipeline stage (`resize`, `watermark`, `disclaimer`, `encode`).
        stage: &'static str,
        /// The underlying error.
        #[source]
        source: BoxError,
    },

    /// Backend or pipeline constructed with invalid or unreachable settings.
    #[error("configuration error: {reason}")]
    ConfigError {
        /// Description of the problem.
        reason: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

/// Discriminant of a [`StoreError`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StoreError::InvalidPath`].
    InvalidPath,
    /// See [`StoreError::RootPathForbidden`].
    RootPathForbidden,
    /// See [`StoreError::NotFound`].
    NotFound,
    /// See [`StoreError::SameSource`].
    SameSource,
    /// See [`StoreError::NotADirectory`].
    NotADirectory,
    /// See [`StoreError::NotAFile`].
    NotAFile,
    /// See [`StoreError::BackendFailure`].
    BackendFailure,
    /// See [`StoreError::SourceUnreadable`].
    SourceUnreadable,
    /// See [`StoreError::TransformFailed`].
    TransformFailed,
    /// See [`StoreError::ConfigError`].
    ConfigError,
}

impl StoreError {
    /// The error's kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::RootPathForbidden { .. } => ErrorKind::RootPathForbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SameSource { .. } => ErrorKind::SameSource,
            Self::NotADirectory { .. } => ErrorKind::NotADirectory,
            Self::NotAFile { .. } => ErrorKind::NotAFile,
            Self::BackendFailure { .. } => ErrorKind::BackendFailure,
            Self::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            Self::TransformFailed { .. } => ErrorKind::TransformFailed,
            Self::ConfigError { .. } => ErrorKind::ConfigError,
        }
    }

    /// The path the error is about, when it names one.
    pub fn path(&self) -> Option<&StorePath> {
        match self {
            Self::NotFound { path }
            | Self::SameSource { path }
            | Self::NotADirectory { path }
            | Self::NotAFile { path }
            | Self::BackendFailure { path, .. }
            | Self::SourceUnreadable { path, .. }
            | Self::TransformFailed { path, .. } => Some(path),
            Self::InvalidPath { .. } | Self::RootPathForbidden { .. } | Self::ConfigError { .. } => {
                None
            }
        }
    }

    /// Returns `true` for [`ErrorKind::NotFound`].
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Wrap a transport error.
    pub fn backend(
        operation: &'static str,
        path: &StorePath,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::BackendFailure {
            path: path.clone(),
            operation,
            source: source.into(),
        }
    }

    /// Configuration error without an underlying cause.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
            source: None,
        }
    }

    /// Configuration error caused by `source`.
    pub fn config_with(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}

/// Convert an I/O error raised while operating on `path`.
///
/// `NotFound` keeps its meaning; everything else is a [`StoreError::BackendFailure`].
pub(crate) fn io_error(operation: &'static str, path: &StorePath, error: std::io::Error) -> StoreError {
    match error.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound { path: path.clone() },
        _ => StoreError::backend(operation, path, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound { path: p("a/b.txt") };
        assert_eq!(err.to_string(), "not found: a/b.txt");
    }

    #[test]
    fn root_forbidden_display() {
        let err = StoreError::RootPathForbidden { operation: "delete" };
        assert_eq!(err.to_string(), "delete: not allowed on the root path");
        assert_eq!(err.kind(), ErrorKind::RootPathForbidden);
        assert!(err.path().is_none());
    }

    #[test]
    fn backend_failure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = StoreError::backend("read", &p("x"), io);
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
        assert_eq!(err.path(), Some(&p("x")));
        assert!(StdError::source(&err).is_some());
        assert!(err.to_string().starts_with("read failed for x"));
    }

    #[test]
    fn io_not_found_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = io_error("read", &p("gone.txt"), io);
        assert!(err.is_not_found());
    }

    #[test]
    fn io_other_maps_to_backend_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = io_error("write", &p("locked"), io);
        assert_eq!(err.kind(), ErrorKind::BackendFailure);
    }

    #[test]
    fn config_error_with_source() {
        let err = StoreError::config_with("login rejected", std::io::Error::other("530"));
        assert_eq!(err.kind(), ErrorKind::ConfigError);
        assert!(StdError::source(&err).is_some());
        assert_eq!(StoreError::config("x").to_string(), "configuration error: x");
    }

    #[test]
    fn store_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
