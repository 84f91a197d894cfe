//! Core value types shared by backends and handles.

use std::time::SystemTime;

use crate::StorePath;

/// Type of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Public/private access of an entry.
///
/// Each backend maps this onto its native permission model: mode bits for
/// local, FTP and SFTP, a visibility flag for adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Access {
    /// Readable by everyone.
    #[default]
    Public,
    /// Readable by the owner only.
    Private,
}

impl Access {
    /// Returns `true` for [`Access::Public`].
    #[inline]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

impl From<bool> for Access {
    fn from(public: bool) -> Self {
        if public { Self::Public } else { Self::Private }
    }
}

impl From<Access> for bool {
    fn from(access: Access) -> Self {
        access.is_public()
    }
}

/// Unix mode bits used to express [`Access`].
///
/// The mapping is read back through the "others may read" bit, so any pair of
/// modes works as long as the public mode sets `0o004` and the private mode
/// clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessModes {
    /// Mode for public files.
    pub file_public: u32,
    /// Mode for private files.
    pub file_private: u32,
    /// Mode for public directories.
    pub dir_public: u32,
    /// Mode for private directories.
    pub dir_private: u32,
}

/// Bit that distinguishes public from private entries.
pub const OTHER_READ: u32 = 0o004;

impl AccessModes {
    /// Mode to apply for `access` on an entry of type `file_type`.
    pub const fn mode_for(&self, file_type: FileType, access: Access) -> u32 {
        match (file_type, access) {
            (FileType::File, Access::Public) => self.file_public,
            (FileType::File, Access::Private) => self.file_private,
            (FileType::Directory, Access::Public) => self.dir_public,
            (FileType::Directory, Access::Private) => self.dir_private,
        }
    }

    /// Interpret raw mode bits.
    pub const fn access_of(mode: u32) -> Access {
        if mode & OTHER_READ != 0 {
            Access::Public
        } else {
            Access::Private
        }
    }
}

impl Default for AccessModes {
    fn default() -> Self {
        Self {
            file_public: 0o644,
            file_private: 0o600,
            dir_public: 0o755,
            dir_private: 0o700,
        }
    }
}

/// Stat record for one entry, also used as a listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    /// Full path of the entry.
    pub path: StorePath,
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Public/private access.
    pub access: Access,
}

impl Entry {
    /// Synthetic record for the root directory.
    pub fn root() -> Self {
        Self {
            path: StorePath::root(),
            file_type: FileType::Directory,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            access: Access::Public,
        }
    }

    /// Final path segment (empty for the root).
    pub fn name(&self) -> &str {
        self.path.basename().unwrap_or("")
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if the name starts with a dot.
    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.name().starts_with('.')
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_from_bool_round_trips() {
        assert_eq!(Access::from(true), Access::Public);
        assert_eq!(Access::from(false), Access::Private);
        assert!(bool::from(Access::Public));
        assert!(!bool::from(Access::Private));
    }

    #[test]
    fn access_modes_round_trip_for_both_types() {
        let modes = AccessModes::default();
        for file_type in [FileType::File, FileType::Directory] {
            for access in [Access::Public, Access::Private] {
                let mode = modes.mode_for(file_type, access);
                assert_eq!(AccessModes::access_of(mode), access);
            }
        }
    }

    #[test]
    fn access_of_ignores_type_bits() {
        assert_eq!(AccessModes::access_of(0o100644), Access::Public);
        assert_eq!(AccessModes::access_of(0o040700), Access::Private);
    }

    #[test]
    fn entry_root_is_directory() {
        let root = Entry::root();
        assert!(root.is_dir());
        assert_eq!(root.name(), "");
        assert!(!root.is_hidden());
    }

    #[test]
    fn entry_hidden_by_leading_dot() {
        let entry = Entry {
            path: StorePath::parse("dir/.cache").unwrap(),
            file_type: FileType::Directory,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            access: Access::Private,
        };
        assert!(entry.is_hidden());
        assert_eq!(entry.name(), ".cache");
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<Access>();
        assert_send_sync::<AccessModes>();
        assert_send_sync::<Entry>();
    }
}
