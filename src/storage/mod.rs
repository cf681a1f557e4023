pub mod migrations;

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::shared::errors::StorageError;
use crate::shared::paths::{ensure_dir, DATABASE_FILE};
use crate::tags::library::TagLibraryStore;
use crate::tags::types::TagGroup;

/// Key under which the tag library blob is stored.
pub const TAG_GROUPS_KEY: &str = "tag_groups";

/// Database wrapper with thread-safe connection
pub struct Database(pub Mutex<Connection>);

impl Database {
    /// Read a value from the key-value table
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.0.lock().map_err(|e| StorageError::lock(e.to_string()))?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a value in the key-value table
    pub fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.0.lock().map_err(|e| StorageError::lock(e.to_string()))?;
        let updated_at = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, updated_at],
        )?;
        Ok(())
    }
}

/// Initialize the database under `storage_dir`, run migrations, and import
/// a legacy JSON tag library if one is lying around.
pub fn init_database(storage_dir: &Path) -> Result<Database, StorageError> {
    ensure_dir(storage_dir)
        .map_err(|e| StorageError::directory(format!("{}: {}", storage_dir.display(), e)))?;

    let db_path = storage_dir.join(DATABASE_FILE);
    let conn = Connection::open(&db_path)?;

    migrations::run_migrations(&conn)?;

    if let Err(e) = migrations::migrate_legacy_json(&conn, storage_dir) {
        tracing::warn!(target: "storage", "Failed to migrate legacy tag library: {}", e);
    }

    tracing::info!(target: "storage", "Database initialized at {:?}", db_path);

    Ok(Database(Mutex::new(conn)))
}

/// In-memory database with the schema applied.
pub fn open_in_memory() -> Result<Database, StorageError> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(Database(Mutex::new(conn)))
}

/// Tag library persisted as one JSON blob in the key-value table.
#[derive(Clone)]
pub struct SqliteTagStore {
    db: Arc<Database>,
}

impl SqliteTagStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl TagLibraryStore for SqliteTagStore {
    fn load_tag_groups(&self) -> Result<Vec<TagGroup>, StorageError> {
        match self.db.get(TAG_GROUPS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save_tag_groups(&self, groups: &[TagGroup]) -> Result<(), StorageError> {
        let json = serde_json::to_string(groups)?;
        self.db.put(TAG_GROUPS_KEY, &json)?;
        tracing::debug!(target: "storage", groups = groups.len(), "Tag library saved");
        Ok(())
    }
}
