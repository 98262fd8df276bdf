use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::category::VaultCategory;
use crate::item::CollectibleItem;
use crate::store::{StoreError, VaultStore};

/// SQLite-backed implementation of the VaultStore trait.
///
/// Items are stored as one JSON payload per row, keyed by id, with the
/// category denormalized into its own indexed column so partition scans and
/// partition clears never touch the payload. Each upsert is a single
/// statement, which gives the per-item atomicity the store contract requires.
pub struct SqliteVaultStore {
    conn: Mutex<Connection>,
}

impl SqliteVaultStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Unavailable(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                payload TEXT NOT NULL,
                date_added INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS legacy_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);
            CREATE INDEX IF NOT EXISTS idx_items_date_added ON items(date_added);
            ",
        )
        .map_err(|e| StoreError::Unavailable(format!("init_schema: {}", e)))
    }

    fn decode_payload(id: &str, payload: &str) -> Result<CollectibleItem, StoreError> {
        serde_json::from_str(payload)
            .map_err(|e| StoreError::Corrupt(format!("item {}: {}", id, e)))
    }

    fn collect_items(
        conn: &Connection,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<CollectibleItem>, StoreError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::Storage(format!("prepare: {}", e)))?;
        let rows = stmt
            .query_map(args, |row| {
                let id: String = row.get(0)?;
                let payload: String = row.get(1)?;
                Ok((id, payload))
            })
            .map_err(|e| StoreError::Storage(format!("query: {}", e)))?;

        let mut items = Vec::new();
        for row in rows {
            let (id, payload) = row.map_err(|e| StoreError::Storage(format!("row: {}", e)))?;
            items.push(Self::decode_payload(&id, &payload)?);
        }
        Ok(items)
    }

    /// Raw value stored under a legacy key, if any. Used only by migration.
    pub fn read_legacy_blob(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM legacy_kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::Storage(format!("read legacy: {}", e)))
    }

    /// Store a value under a legacy key. Exists for imports and tests.
    pub fn write_legacy_blob(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO legacy_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| StoreError::Storage(format!("write legacy: {}", e)))?;
        Ok(())
    }

    /// Remove a legacy key once its contents have been migrated.
    pub fn delete_legacy_blob(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM legacy_kv WHERE key = ?1", params![key])
            .map_err(|e| StoreError::Storage(format!("delete legacy: {}", e)))?;
        Ok(())
    }
}

impl VaultStore for SqliteVaultStore {
    fn all_items(&self) -> Result<Vec<CollectibleItem>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::collect_items(&conn, "SELECT id, payload FROM items", &[])
    }

    fn items_in(&self, category: VaultCategory) -> Result<Vec<CollectibleItem>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::collect_items(
            &conn,
            "SELECT id, payload FROM items WHERE category = ?1",
            &[&category.as_str()],
        )
    }

    fn get_item(&self, id: &str) -> Result<Option<CollectibleItem>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM items WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("get: {}", e)))?;
        payload.map(|p| Self::decode_payload(id, &p)).transpose()
    }

    fn save_item(&self, item: &CollectibleItem) -> Result<(), StoreError> {
        let normalized = item.clone().normalized();
        let payload = serde_json::to_string(&normalized)
            .map_err(|e| StoreError::Storage(format!("encode: {}", e)))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO items (id, category, payload, date_added)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 payload = excluded.payload,
                 date_added = excluded.date_added",
            params![
                normalized.id,
                normalized.category.as_str(),
                payload,
                normalized.date_added.timestamp_millis(),
            ],
        )
        .map_err(|e| StoreError::Storage(format!("save: {}", e)))?;
        Ok(())
    }

    fn delete_item(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        // Zero rows affected is fine: deleting an absent id is a no-op.
        conn.execute("DELETE FROM items WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("delete: {}", e)))?;
        Ok(())
    }

    fn clear_vault(&self, category: VaultCategory) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let removed = conn
            .execute(
                "DELETE FROM items WHERE category = ?1",
                params![category.as_str()],
            )
            .map_err(|e| StoreError::Storage(format!("clear: {}", e)))?;
        tracing::debug!(vault = %category, removed, "cleared vault partition");
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .map_err(|e| StoreError::Storage(format!("count: {}", e)))?;
        Ok(n as usize)
    }
}
