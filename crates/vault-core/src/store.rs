use crate::category::VaultCategory;
use crate::item::CollectibleItem;

/// The trait every local storage backend implements.
///
/// Each operation is atomic per item; the store never serializes writes
/// beyond that, so concurrent upserts to the same id are last-write-wins.
/// Ordering of enumeration results is storage-native and unspecified;
/// callers sort (the UI sorts by `date_added` descending).
pub trait VaultStore: Send + Sync {
    /// Every stored item across all vaults. Empty store yields an empty vec.
    fn all_items(&self) -> Result<Vec<CollectibleItem>, StoreError>;

    /// Items in one vault partition.
    fn items_in(&self, category: VaultCategory) -> Result<Vec<CollectibleItem>, StoreError>;

    /// Look up a single item by id.
    fn get_item(&self, id: &str) -> Result<Option<CollectibleItem>, StoreError>;

    /// Upsert by id: an existing record is replaced wholesale, a new one is
    /// inserted into the partition named by `item.category`.
    fn save_item(&self, item: &CollectibleItem) -> Result<(), StoreError>;

    /// Remove an item wherever it lives. No-op when the id is absent.
    fn delete_item(&self, id: &str) -> Result<(), StoreError>;

    /// Remove every item in one vault, leaving other vaults untouched.
    fn clear_vault(&self, category: VaultCategory) -> Result<(), StoreError>;

    /// Total item count across all vaults.
    fn count(&self) -> Result<usize, StoreError>;
}

/// Errors from the local store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage engine could not be opened. Fatal to the read path.
    #[error("Vault storage unavailable: {0}")]
    Unavailable(String),

    /// An individual read/write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A persisted payload no longer decodes.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
