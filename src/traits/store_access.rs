//! Public/private access management.

use crate::{Access, StoreError, StorePath};

/// Public/private access management.
///
/// Implementations must round-trip: after `set_access(p, a)`,
/// `access(p)` returns `a` for files and directories alike.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn StoreAccess`.
pub trait StoreAccess: Send + Sync {
    /// Current access of a path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path does not exist
    fn access(&self, path: &StorePath) -> Result<Access, StoreError>;

    /// Change the access of a path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the path does not exist
    fn set_access(&self, path: &StorePath, access: Access) -> Result<(), StoreError>;
}
