//! Address projections of stored paths.

use crate::StorePath;

/// Projections of a relative path into backend-native addresses.
pub trait StoreLocation: Send + Sync {
    /// Absolute local path or remote address of `path`.
    fn location(&self, path: &StorePath) -> String;

    /// Public URL of `path`, when the backend is configured with a base URL.
    fn url(&self, _path: &StorePath) -> Option<String> {
        None
    }
}

/// Join a configured base URL with a store path.
pub(crate) fn join_url(base: &str, path: &StorePath) -> String {
    let base = base.trim_end_matches('/');
    if path.is_root() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}
