//! One-time migration from the legacy flat-blob format.
//!
//! Early builds kept the whole collection as a single JSON array under one
//! storage key. Migration replays that array item-by-item into the
//! partitioned store, then discards the blob. It only ever runs against a
//! genuinely empty target, and each copy is an upsert, so an interrupted
//! run that resumes deduplicates naturally.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::category::VaultCategory;
use crate::item::{retain_citable, CollectibleItem, Condition, SourceRef};
use crate::sqlite_store::SqliteVaultStore;
use crate::store::{StoreError, VaultStore};

/// Historical key the flat blob lived under.
pub const LEGACY_STORAGE_KEY: &str = "comicvault_data_v2";

/// Where a legacy blob can be read from, and removed once migrated.
pub trait LegacyStash {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn remove(&self) -> Result<(), StoreError>;
}

impl LegacyStash for SqliteVaultStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        self.read_legacy_blob(LEGACY_STORAGE_KEY)
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.delete_legacy_blob(LEGACY_STORAGE_KEY)
    }
}

/// A legacy export sitting in a standalone JSON file.
pub struct LegacyFile(pub PathBuf);

impl LegacyStash for LegacyFile {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.0) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Storage(format!("read legacy file: {}", e))),
        }
    }

    fn remove(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.0) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("remove legacy file: {}", e))),
        }
    }
}

/// What a migration run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Legacy items were copied and the blob was discarded.
    Migrated,
    /// The target store already held items; nothing was touched.
    SkippedNonEmptyTarget,
    /// No legacy blob existed.
    NoLegacyData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub outcome: MigrationOutcome,
    /// Items copied into the partitioned store.
    pub migrated: usize,
    /// Legacy records dropped because they could not be mapped to an item
    /// (missing id, unknown category).
    pub skipped_records: usize,
}

/// Run the startup migration. Must complete before the first read is trusted.
///
/// If any copy fails, the error propagates and the legacy blob is left in
/// place so the next startup retries from scratch.
pub fn migrate_legacy(
    store: &impl VaultStore,
    legacy: &impl LegacyStash,
) -> Result<MigrationReport, StoreError> {
    if store.count()? > 0 {
        tracing::debug!("vault store non-empty, skipping legacy migration");
        return Ok(MigrationReport {
            outcome: MigrationOutcome::SkippedNonEmptyTarget,
            migrated: 0,
            skipped_records: 0,
        });
    }

    let Some(blob) = legacy.read()? else {
        return Ok(MigrationReport {
            outcome: MigrationOutcome::NoLegacyData,
            migrated: 0,
            skipped_records: 0,
        });
    };

    let records: Vec<Value> = serde_json::from_str(&blob)
        .map_err(|e| StoreError::Corrupt(format!("legacy blob: {}", e)))?;

    let mut migrated = 0usize;
    let mut skipped = 0usize;
    for record in &records {
        match decode_legacy_record(record) {
            Some(item) => {
                store.save_item(&item)?;
                migrated += 1;
            }
            None => {
                tracing::warn!("skipping unmappable legacy record");
                skipped += 1;
            }
        }
    }

    legacy.remove()?;
    tracing::debug!(migrated, skipped, "legacy migration complete");
    Ok(MigrationReport {
        outcome: MigrationOutcome::Migrated,
        migrated,
        skipped_records: skipped,
    })
}

fn string_field(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn value_field(record: &Value, key: &str) -> f64 {
    match record.get(key) {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn timestamp_field(record: &Value, key: &str) -> Option<DateTime<Utc>> {
    record
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

/// Map one legacy record to an item, defaulting anything recoverable and
/// returning `None` only when identity (id or category) is unusable.
/// Legacy ids are preserved verbatim so a resumed migration deduplicates.
fn decode_legacy_record(record: &Value) -> Option<CollectibleItem> {
    let id = match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return None,
    };
    let category: VaultCategory = record.get("category")?.as_str()?.parse().ok()?;

    let condition = record
        .get("condition")
        .and_then(|v| serde_json::from_value::<Condition>(v.clone()).ok())
        .unwrap_or_default();

    // Pre-appraisal builds only had a free-text `notes` field.
    let significance = ["significance", "keyFeatures", "notes"]
        .iter()
        .map(|&k| string_field(record, k))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let facts = record
        .get("facts")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let sources = record
        .get("sources")
        .and_then(|v| serde_json::from_value::<Vec<SourceRef>>(v.clone()).ok())
        .map(retain_citable)
        .unwrap_or_default();

    let image = ["image", "imageUrl"]
        .iter()
        .map(|&k| string_field(record, k))
        .find(|s| !s.is_empty());

    let date_added = timestamp_field(record, "dateAdded").unwrap_or_else(Utc::now);
    let last_valued = timestamp_field(record, "lastValued").unwrap_or(date_added);

    Some(
        CollectibleItem {
            id,
            category,
            title: string_field(record, "title"),
            sub_title: string_field(record, "subTitle"),
            provider: string_field(record, "provider"),
            year: string_field(record, "year"),
            condition,
            significance,
            estimated_value: value_field(record, "estimatedValue"),
            facts,
            ai_justification: string_field(record, "aiJustification"),
            sources,
            image,
            date_added,
            last_valued,
        }
        .normalized(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_blob() -> String {
        json!([
            {
                "id": "lxyz01",
                "category": "comics",
                "title": "Spawn",
                "subTitle": "#1",
                "provider": "Image",
                "year": "1992",
                "condition": "Near Mint",
                "notes": "First McFarlane creator-owned issue",
                "estimatedValue": "45.50",
                "imageUrl": "data:image/jpeg;base64,abc",
                "dateAdded": "2023-06-01T12:00:00Z"
            },
            {
                "id": "lxyz02",
                "category": "sports",
                "title": "Ken Griffey Jr.",
                "subTitle": "1989 Upper Deck #1",
                "provider": "Upper Deck",
                "year": "1989",
                "condition": "Slabbed",
                "estimatedValue": 120
            }
        ])
        .to_string()
    }

    #[test]
    fn migrates_into_empty_store_and_removes_blob() {
        let store = SqliteVaultStore::open_in_memory().unwrap();
        store
            .write_legacy_blob(LEGACY_STORAGE_KEY, &legacy_blob())
            .unwrap();

        let report = migrate_legacy(&store, &store).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Migrated);
        assert_eq!(report.migrated, 2);
        assert_eq!(report.skipped_records, 0);
        assert_eq!(store.read_legacy_blob(LEGACY_STORAGE_KEY).unwrap(), None);

        // Legacy ids survive, lenient fields are mapped.
        let spawn = store.get_item("lxyz01").unwrap().unwrap();
        assert_eq!(spawn.category, VaultCategory::Comics);
        assert_eq!(spawn.estimated_value, 45.5);
        assert_eq!(spawn.significance, "First McFarlane creator-owned issue");
        assert_eq!(spawn.condition, Condition::NearMint);
        assert_eq!(spawn.image.as_deref(), Some("data:image/jpeg;base64,abc"));

        let griffey = store.get_item("lxyz02").unwrap().unwrap();
        assert_eq!(griffey.estimated_value, 120.0);
        // Unknown condition label degrades to the default rather than failing.
        assert_eq!(griffey.condition, Condition::Ungraded);
    }

    #[test]
    fn skips_when_target_already_populated() {
        let store = SqliteVaultStore::open_in_memory().unwrap();
        let existing = crate::item::tests::sample_item(VaultCategory::Coins);
        store.save_item(&existing).unwrap();
        store
            .write_legacy_blob(LEGACY_STORAGE_KEY, &legacy_blob())
            .unwrap();

        let report = migrate_legacy(&store, &store).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::SkippedNonEmptyTarget);
        assert_eq!(report.migrated, 0);

        // Target unchanged, legacy blob not consumed.
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.read_legacy_blob(LEGACY_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn no_legacy_data_is_a_clean_no_op() {
        let store = SqliteVaultStore::open_in_memory().unwrap();
        let report = migrate_legacy(&store, &store).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::NoLegacyData);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn unmappable_records_are_counted_not_fatal() {
        let store = SqliteVaultStore::open_in_memory().unwrap();
        let blob = json!([
            { "id": "ok1", "category": "coins", "title": "Wheat Penny" },
            { "id": "bad", "category": "stamps", "title": "Inverted Jenny" },
            { "category": "comics", "title": "no id at all" }
        ])
        .to_string();
        store.write_legacy_blob(LEGACY_STORAGE_KEY, &blob).unwrap();

        let report = migrate_legacy(&store, &store).unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.skipped_records, 2);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn corrupt_blob_aborts_and_keeps_legacy_key() {
        let store = SqliteVaultStore::open_in_memory().unwrap();
        store
            .write_legacy_blob(LEGACY_STORAGE_KEY, "not json at all")
            .unwrap();

        let err = migrate_legacy(&store, &store).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(store.read_legacy_blob(LEGACY_STORAGE_KEY).unwrap().is_some());
    }

    /// Store whose writes always fail, for abort-path coverage.
    struct FailingStore(SqliteVaultStore);

    impl VaultStore for FailingStore {
        fn all_items(&self) -> Result<Vec<CollectibleItem>, StoreError> {
            self.0.all_items()
        }
        fn items_in(&self, c: VaultCategory) -> Result<Vec<CollectibleItem>, StoreError> {
            self.0.items_in(c)
        }
        fn get_item(&self, id: &str) -> Result<Option<CollectibleItem>, StoreError> {
            self.0.get_item(id)
        }
        fn save_item(&self, _item: &CollectibleItem) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
        fn delete_item(&self, id: &str) -> Result<(), StoreError> {
            self.0.delete_item(id)
        }
        fn clear_vault(&self, c: VaultCategory) -> Result<(), StoreError> {
            self.0.clear_vault(c)
        }
        fn count(&self) -> Result<usize, StoreError> {
            self.0.count()
        }
    }

    #[test]
    fn failed_copy_leaves_legacy_blob_for_retry() {
        let inner = SqliteVaultStore::open_in_memory().unwrap();
        inner
            .write_legacy_blob(LEGACY_STORAGE_KEY, &legacy_blob())
            .unwrap();
        let store = FailingStore(inner);

        let err = migrate_legacy(&store, &store.0).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(store
            .0
            .read_legacy_blob(LEGACY_STORAGE_KEY)
            .unwrap()
            .is_some());
    }

    #[test]
    fn legacy_file_stash_reads_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, legacy_blob()).unwrap();

        let store = SqliteVaultStore::open_in_memory().unwrap();
        let stash = LegacyFile(path.clone());
        let report = migrate_legacy(&store, &stash).unwrap();
        assert_eq!(report.migrated, 2);
        assert!(!path.exists());

        // A second run sees no legacy data.
        let report = migrate_legacy(&SqliteVaultStore::open_in_memory().unwrap(), &stash).unwrap();
        assert_eq!(report.outcome, MigrationOutcome::NoLegacyData);
    }
}
