//! Uploaded files as received from an HTTP form.
//!
//! [`UploadedFile`] is the plain tuple a web layer hands over after spooling a
//! multipart upload to disk. Validation is pure; storing goes through
//! [`FileHandle::import_upload`](crate::FileHandle::import_upload).

use std::path::PathBuf;

use crate::{StorageName, StoreError, StorePath};

/// Transport status of an upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UploadError {
    /// Received completely.
    #[default]
    Ok,
    /// Larger than the server-wide limit.
    ServerLimit,
    /// Larger than the form's declared limit.
    FormLimit,
    /// Only part of the file arrived.
    Partial,
    /// No file was sent.
    NoFile,
    /// The server has no temporary directory.
    NoTempDir,
    /// The temporary file could not be written.
    CantWrite,
    /// A server extension stopped the upload.
    Extension,
}

impl UploadError {
    /// Map the numeric status codes used by common web servers.
    ///
    /// Unknown codes map to [`UploadError::Extension`].
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::ServerLimit,
            2 => Self::FormLimit,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTempDir,
            7 => Self::CantWrite,
            _ => Self::Extension,
        }
    }

    /// Human-readable reason, or `None` for a complete upload.
    pub fn rejection(self) -> Option<&'static str> {
        match self {
            Self::Ok => None,
            Self::ServerLimit => Some("file exceeds the server upload limit"),
            Self::FormLimit => Some("file exceeds the form upload limit"),
            Self::Partial => Some("file was only partially uploaded"),
            Self::NoFile => Some("no file was uploaded"),
            Self::NoTempDir => Some("missing temporary folder"),
            Self::CantWrite => Some("failed to write file to disk"),
            Self::Extension => Some("upload stopped by an extension"),
        }
    }
}

/// Why [`UploadedFile::validate`] rejected an upload.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejected {
    /// The transport reported a failure.
    #[error("upload failed: {reason}")]
    Transport {
        /// Transport status.
        status: UploadError,
        /// Description of the status.
        reason: &'static str,
    },

    /// The file is empty.
    #[error("uploaded file {name:?} is empty")]
    Empty {
        /// Client-side file name.
        name: String,
    },

    /// The file exceeds the configured maximum.
    #[error("uploaded file {name:?} is {size} bytes, limit is {max}")]
    TooLarge {
        /// Client-side file name.
        name: String,
        /// Reported size.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// The client sent no usable file name.
    #[error("uploaded file has no usable name")]
    Nameless,
}

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadedFile {
    /// Name the client sent.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Mime type the client sent.
    pub mime_type: String,
    /// Transport status.
    pub error: UploadError,
    /// Spooled temporary file.
    pub temp_path: PathBuf,
}

impl UploadedFile {
    /// Client file name reduced to its final segment.
    ///
    /// Browsers on some platforms send full paths; only the last component
    /// is kept, with backslashes treated as separators.
    pub fn file_name(&self) -> Option<String> {
        let unified = self.name.replace('\\', "/");
        let path = StorePath::parse(&unified).ok()?;
        path.basename().map(str::to_owned)
    }

    /// Check the upload without touching the filesystem.
    ///
    /// `max_size` of `None` means no limit.
    pub fn validate(&self, max_size: Option<u64>) -> Result<(), UploadRejected> {
        if let Some(reason) = self.error.rejection() {
            return Err(UploadRejected::Transport {
                status: self.error,
                reason,
            });
        }
        if self.file_name().is_none() {
            return Err(UploadRejected::Nameless);
        }
        if self.size == 0 {
            return Err(UploadRejected::Empty {
                name: self.name.clone(),
            });
        }
        if let Some(max) = max_size.filter(|&max| self.size > max) {
            return Err(UploadRejected::TooLarge {
                name: self.name.clone(),
                size: self.size,
                max,
            });
        }
        Ok(())
    }

    /// Storage name for this upload at `position` of `attribute`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidPath`] if the upload has no usable name or the
    ///   attribute is invalid
    pub fn storage_name(&self, attribute: &str, position: u32) -> Result<StorageName, StoreError> {
        let name = self.file_name().ok_or_else(|| StoreError::InvalidPath {
            path: self.name.clone(),
            reason: "upload has no usable file name",
        })?;
        StorageName::new(attribute, position, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, size: u64, error: UploadError) -> UploadedFile {
        UploadedFile {
            name: name.to_owned(),
            size,
            mime_type: "image/png".to_owned(),
            error,
            temp_path: PathBuf::from("/tmp/upload-123"),
        }
    }

    #[test]
    fn accepts_complete_upload() {
        assert_eq!(upload("a.png", 10, UploadError::Ok).validate(Some(10)), Ok(()));
        assert_eq!(upload("a.png", 10, UploadError::Ok).validate(None), Ok(()));
    }

    #[test]
    fn rejects_transport_errors_first() {
        let err = upload("a.png", 0, UploadError::Partial).validate(None).unwrap_err();
        assert!(matches!(err, UploadRejected::Transport { status: UploadError::Partial, .. }));
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(matches!(
            upload("a.png", 0, UploadError::Ok).validate(None),
            Err(UploadRejected::Empty { .. })
        ));
        assert!(matches!(
            upload("a.png", 11, UploadError::Ok).validate(Some(10)),
            Err(UploadRejected::TooLarge { size: 11, max: 10, .. })
        ));
    }

    #[test]
    fn file_name_strips_client_directories() {
        assert_eq!(
            upload(r"C:\Users\me\cat.png", 1, UploadError::Ok).file_name().as_deref(),
            Some("cat.png")
        );
        assert_eq!(upload("../../etc/passwd", 1, UploadError::Ok).file_name().as_deref(), Some("passwd"));
        assert_eq!(upload("..", 1, UploadError::Ok).file_name(), None);
    }

    #[test]
    fn status_codes() {
        assert_eq!(UploadError::from_code(0), UploadError::Ok);
        assert_eq!(UploadError::from_code(4), UploadError::NoFile);
        assert_eq!(UploadError::from_code(42), UploadError::Extension);
        assert!(UploadError::Ok.rejection().is_none());
    }

    #[test]
    fn storage_name_uses_basename() {
        let name = upload("dir/photo.jpg", 5, UploadError::Ok)
            .storage_name("gallery", 2)
            .unwrap();
        assert_eq!(name.to_string(), "gallery~2~photo.jpg");
    }
}
