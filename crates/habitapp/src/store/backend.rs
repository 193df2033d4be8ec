use super::StoreKey;
use crate::error::Result;

/// Abstract interface for raw key-value storage I/O.
///
/// Each key holds one whole-collection JSON snapshot. Backends know nothing
/// about habits; the typed layer in [`super`] does the (de)serialization.
///
/// Backends are moved onto the persistence worker thread, hence `Send`.
pub trait StorageBackend: Send + 'static {
    /// Read the snapshot stored under `key`.
    /// Returns Ok(None) if nothing was ever saved there.
    /// Returns Err only on actual I/O errors (permissions, disk failure).
    fn load(&self, key: StoreKey) -> Result<Option<String>>;

    /// Replace the snapshot stored under `key`.
    /// MUST be atomic (e.g. write to tmp then rename) to avoid partial writes.
    fn save(&self, key: StoreKey, payload: &str) -> Result<()>;
}
