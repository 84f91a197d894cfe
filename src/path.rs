//! # Store Paths
//!
//! Canonical, root-relative paths shared by every backend.
//!
//! ## Rules
//!
//! - Segments are separated by `/`; empty and `.` segments are dropped.
//! - `..` discards the previous segment, and is a no-op at the root.
//! - The root is the empty segment list and renders as `""`.
//! - A segment may not contain NUL.
//!
//! ```rust
//! use anystore::StorePath;
//!
//! let p = StorePath::parse("/dir/../dir/to/./file").unwrap();
//! assert_eq!(p.to_string(), "dir/to/file");
//! assert_eq!(p.basename(), Some("file"));
//! assert_eq!(p.parent().unwrap().to_string(), "dir/to");
//! assert!(StorePath::parse("/./.").unwrap().is_root());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::StoreError;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// A normalized, root-relative path.
///
/// Construction always normalizes, so holding a `StorePath` means the value
/// never starts or ends with a separator and never contains `.` or `..`.
///
/// Ordering compares the rendered strings byte by byte, which is the order
/// listings are returned in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root path.
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Normalize a separator-joined string.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if a segment contains NUL
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        Self::from_segments([input])
    }

    /// Normalize a list of segments.
    ///
    /// Items may themselves contain separators; they are split the same way
    /// [`parse`](Self::parse) splits a string.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for raw in segments {
            path.push_raw(raw.as_ref())?;
        }
        Ok(path)
    }

    fn push_raw(&mut self, raw: &str) -> Result<(), StoreError> {
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    self.segments.pop();
                }
                s if s.contains('\0') => {
                    return Err(StoreError::InvalidPath {
                        path: raw.to_owned(),
                        reason: "segment contains NUL",
                    });
                }
                s => self.segments.push(s.to_owned()),
            }
        }
        Ok(())
    }

    /// Append `child` (string form) and normalize the result.
    ///
    /// A `..` in `child` may consume segments of `self`, but never climbs past
    /// the root.
    pub fn join(&self, child: &str) -> Result<Self, StoreError> {
        let mut path = self.clone();
        path.push_raw(child)?;
        Ok(path)
    }

    /// Append an already-normalized path.
    pub fn join_path(&self, child: &StorePath) -> Self {
        let mut path = self.clone();
        path.segments.extend(child.segments.iter().cloned());
        path
    }

    /// Parent directory, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.segments.split_last()?;
        Some(Self {
            segments: head.to_vec(),
        })
    }

    /// Final segment, or `None` for the root.
    pub fn basename(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Final segment without its last extension.
    ///
    /// A leading dot does not start an extension, so `.env` has stem `.env`.
    pub fn stem(&self) -> Option<&str> {
        let name = self.basename()?;
        match name.rfind('.') {
            Some(0) | None => Some(name),
            Some(idx) => Some(&name[..idx]),
        }
    }

    /// Extension of the final segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.basename()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Same directory, different final segment.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if `self` is the root or `name` does not
    ///   normalize to exactly one segment
    pub fn with_file_name(&self, name: &str) -> Result<Self, StoreError> {
        let parent = self.parent().ok_or_else(|| StoreError::InvalidPath {
            path: name.to_owned(),
            reason: "root has no file name",
        })?;
        let leaf = Self::parse(name)?;
        if leaf.segments.len() != 1 {
            return Err(StoreError::InvalidPath {
                path: name.to_owned(),
                reason: "file name must be a single segment",
            });
        }
        Ok(parent.join_path(&leaf))
    }

    /// Returns `true` for the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path segments, outermost first.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if `prefix` is an ancestor of (or equal to) `self`.
    pub fn starts_with(&self, prefix: &StorePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The part of `self` below `prefix`, or `None` if `prefix` is not an
    /// ancestor.
    pub fn strip_prefix(&self, prefix: &StorePath) -> Option<Self> {
        let rest = self.segments.strip_prefix(prefix.segments.as_slice())?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    fn rendered_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments.iter().enumerate().flat_map(|(i, s)| {
            let sep = (i > 0).then_some(SEPARATOR as u8);
            sep.into_iter().chain(s.bytes())
        })
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl Ord for StorePath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rendered_bytes().cmp(other.rendered_bytes())
    }
}

impl PartialOrd for StorePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for StorePath {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for StorePath {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StorePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StorePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
