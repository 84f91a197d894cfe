//! # Storage Traits
//!
//! The capability set every backend implements.
//!
//! ## Components
//!
//! | Trait | Methods |
//! |-------|---------|
//! | [`StoreRead`] | `exists`, `metadata`, `read`, `read_stream`, `mime_type` |
//! | [`StoreWrite`] | `write`, `write_stream`, `delete`, `rename`, `copy` |
//! | [`StoreDir`] | `list_children`, `mkdir` |
//! | [`StoreAccess`] | `access`, `set_access` |
//! | [`StoreLocation`] | `location`, `url` |
//!
//! [`StoreBackend`] combines them and has a blanket implementation: implement
//! the components and the composite comes for free.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`, so one backend can be
//! shared by many [`FileHandle`](crate::FileHandle)s behind an `Arc`.

mod store_access;
mod store_dir;
mod store_location;
mod store_read;
mod store_write;

pub use store_access::StoreAccess;
pub use store_dir::StoreDir;
pub use store_location::StoreLocation;
pub use store_read::{DIRECTORY_MIME, StoreRead};
pub use store_write::StoreWrite;

pub(crate) use store_location::join_url;

/// A complete storage backend.
///
/// Automatically implemented for any type implementing all component traits.
///
/// # Example
///
/// ```rust
/// use anystore::{StoreBackend, StoreError, StoreExt, StorePath};
///
/// fn archive(backend: &dyn StoreBackend, name: &str) -> Result<u64, StoreError> {
///     let src = StorePath::parse(name)?;
///     let dst = StorePath::parse("archive")?.join(name)?;
///     backend.copy(&src, &dst)?;
///     backend.size(&dst)
/// }
/// ```
pub trait StoreBackend: StoreRead + StoreWrite + StoreDir + StoreAccess + StoreLocation {}

impl<T> StoreBackend for T where T: StoreRead + StoreWrite + StoreDir + StoreAccess + StoreLocation {}

impl std::fmt::Debug for dyn StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn StoreBackend")
    }
}
