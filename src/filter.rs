//! Listing filters.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::{Access, Entry, FileType, StoreError};

type Predicate = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

/// Filter applied by [`StoreExt::list`](crate::StoreExt::list).
///
/// The default filter accepts every direct child. All criteria combine with
/// logical AND.
///
/// ```rust
/// use anystore::ListFilter;
///
/// let filter = ListFilter::new()
///     .files_only()
///     .hidden(false)
///     .name_matches(r"\.jpe?g$")
///     .unwrap();
/// assert_eq!(filter.depth(), 1);
/// ```
#[derive(Clone)]
pub struct ListFilter {
    file_type: Option<FileType>,
    access: Option<Access>,
    hidden: Option<bool>,
    name: Option<Regex>,
    predicate: Option<Predicate>,
    depth: usize,
}

impl ListFilter {
    /// Accept all direct children.
    pub fn new() -> Self {
        Self {
            file_type: None,
            access: None,
            hidden: None,
            name: None,
            predicate: None,
            depth: 1,
        }
    }

    /// Keep only entries of `file_type`.
    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    /// Keep only files.
    pub fn files_only(self) -> Self {
        self.file_type(FileType::File)
    }

    /// Keep only directories.
    pub fn dirs_only(self) -> Self {
        self.file_type(FileType::Directory)
    }

    /// Keep only entries with `access`.
    pub fn access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    /// `false` drops dot-entries (and does not descend into them);
    /// `true` keeps only dot-entries.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Keep entries whose name matches `regex`.
    pub fn name_regex(mut self, regex: Regex) -> Self {
        self.name = Some(regex);
        self
    }

    /// Keep entries whose name matches `pattern`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigError`] if the pattern does not compile
    pub fn name_matches(self, pattern: &str) -> Result<Self, StoreError> {
        let regex = Regex::new(pattern)
            .map_err(|e| StoreError::config_with(format!("invalid name pattern {pattern:?}"), e))?;
        Ok(self.name_regex(regex))
    }

    /// Keep entries accepted by `predicate`.
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Descend up to `depth` levels (1 = direct children only).
    ///
    /// The depth is capped at [`MAX_DEPTH`](crate::walk::MAX_DEPTH).
    pub fn recursive(mut self, depth: usize) -> Self {
        self.depth = depth.clamp(1, crate::walk::MAX_DEPTH);
        self
    }

    /// Listing depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if `entry` passes every criterion.
    pub fn matches(&self, entry: &Entry) -> bool {
        if self.file_type.is_some_and(|t| t != entry.file_type) {
            return false;
        }
        if self.access.is_some_and(|a| a != entry.access) {
            return false;
        }
        if self.hidden.is_some_and(|h| h != entry.is_hidden()) {
            return false;
        }
        if self.name.as_ref().is_some_and(|re| !re.is_match(entry.name())) {
            return false;
        }
        self.predicate.as_ref().is_none_or(|p| p(entry))
    }

    /// Returns `true` if a recursive listing should walk into `entry`.
    pub(crate) fn descends_into(&self, entry: &Entry) -> bool {
        entry.is_dir() && !(self.hidden == Some(false) && entry.is_hidden())
    }
}

impl Default for ListFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListFilter")
            .field("file_type", &self.file_type)
            .field("access", &self.access)
            .field("hidden", &self.hidden)
            .field("name", &self.name.as_ref().map(Regex::as_str))
            .field("predicate", &self.predicate.is_some())
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorePath;
    use std::time::SystemTime;

    fn entry(path: &str, file_type: FileType, access: Access, size: u64) -> Entry {
        Entry {
            path: StorePath::parse(path).unwrap(),
            file_type,
            size,
            modified: SystemTime::UNIX_EPOCH,
            access,
        }
    }

    #[test]
    fn default_accepts_everything() {
        let f = ListFilter::default();
        assert!(f.matches(&entry("a", FileType::File, Access::Public, 1)));
        assert!(f.matches(&entry(".b", FileType::Directory, Access::Private, 0)));
    }

    #[test]
    fn type_filter() {
        let f = ListFilter::new().dirs_only();
        assert!(f.matches(&entry("d", FileType::Directory, Access::Public, 0)));
        assert!(!f.matches(&entry("f", FileType::File, Access::Public, 0)));
    }

    #[test]
    fn access_filter() {
        let f = ListFilter::new().access(Access::Private);
        assert!(f.matches(&entry("x", FileType::File, Access::Private, 0)));
        assert!(!f.matches(&entry("y", FileType::File, Access::Public, 0)));
    }

    #[test]
    fn hidden_filter_both_ways() {
        let visible = ListFilter::new().hidden(false);
        let only_hidden = ListFilter::new().hidden(true);
        let dot = entry("dir/.git", FileType::Directory, Access::Public, 0);
        let plain = entry("dir/src", FileType::Directory, Access::Public, 0);
        assert!(!visible.matches(&dot));
        assert!(visible.matches(&plain));
        assert!(only_hidden.matches(&dot));
        assert!(!only_hidden.matches(&plain));
        assert!(!visible.descends_into(&dot));
        assert!(only_hidden.descends_into(&dot));
    }

    #[test]
    fn name_regex_matches_basename_only() {
        let f = ListFilter::new().name_matches(r"^img_\d+\.png$").unwrap();
        assert!(f.matches(&entry("gallery/img_01.png", FileType::File, Access::Public, 0)));
        assert!(!f.matches(&entry("img_01.png/readme", FileType::File, Access::Public, 0)));
    }

    #[test]
    fn invalid_regex_is_config_error() {
        let err = ListFilter::new().name_matches("(").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigError);
    }

    #[test]
    fn predicate_filter() {
        let f = ListFilter::new().predicate(|e| e.size > 10);
        assert!(f.matches(&entry("big", FileType::File, Access::Public, 11)));
        assert!(!f.matches(&entry("small", FileType::File, Access::Public, 3)));
    }

    #[test]
    fn recursive_depth_is_clamped() {
        assert_eq!(ListFilter::new().recursive(0).depth(), 1);
        assert_eq!(ListFilter::new().recursive(3).depth(), 3);
        assert_eq!(
            ListFilter::new().recursive(usize::MAX).depth(),
            crate::walk::MAX_DEPTH
        );
    }
}
