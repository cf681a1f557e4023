use rusqlite::Connection;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::TAG_GROUPS_KEY;
use crate::shared::errors::StorageError;
use crate::tags::types::{LibraryTag, TagGroup, DEFAULT_GROUP_COLOR, DEFAULT_TEXT_COLOR};

const LEGACY_FILE: &str = "tag-groups.json";

/// Run database schema migrations
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Opaque blobs (tag library, cached state)
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )?;

    tracing::debug!(target: "storage", "Database schema migrations completed");
    Ok(())
}

// Legacy data structures for migration

#[derive(Deserialize)]
struct LegacyGroup {
    id: String,
    name: String,
    #[serde(default, rename = "defaultColor")]
    default_color: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<LegacyTag>,
}

#[derive(Deserialize)]
struct LegacyTag {
    id: String,
    name: String,
    color: String,
    #[serde(default, rename = "textColor")]
    text_color: Option<String>,
}

impl From<LegacyGroup> for TagGroup {
    fn from(legacy: LegacyGroup) -> Self {
        let group_id = legacy.id.clone();
        TagGroup {
            id: legacy.id,
            name: legacy.name,
            default_color: legacy
                .default_color
                .unwrap_or_else(|| DEFAULT_GROUP_COLOR.to_string()),
            description: legacy.description,
            tags: legacy
                .tags
                .into_iter()
                .map(|tag| LibraryTag {
                    id: tag.id,
                    name: tag.name,
                    color: tag.color,
                    text_color: tag.text_color.unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
                    group_id: group_id.clone(),
                })
                .collect(),
        }
    }
}

/// Import a legacy `tag-groups.json` into the key-value table, once.
///
/// The file is renamed to `.bak` afterwards, even if the table already had
/// a library, to avoid repeated attempts.
pub fn migrate_legacy_json(conn: &Connection, storage_dir: &Path) -> Result<(), StorageError> {
    let json_path = storage_dir.join(LEGACY_FILE);

    if !json_path.exists() {
        return Ok(());
    }

    tracing::info!(target: "storage", "Found legacy {}, starting migration...", LEGACY_FILE);

    let backup_path = storage_dir.join(format!("{}.bak", LEGACY_FILE));

    let existing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM kv WHERE key = ?1",
        [TAG_GROUPS_KEY],
        |row| row.get(0),
    )?;
    if existing > 0 {
        tracing::info!(target: "storage", "Database already has a tag library, skipping migration");
        fs::rename(&json_path, &backup_path)?;
        return Ok(());
    }

    let json_content = fs::read_to_string(&json_path)?;
    let legacy: Vec<LegacyGroup> = serde_json::from_str(&json_content)?;
    let groups: Vec<TagGroup> = legacy.into_iter().map(TagGroup::from).collect();
    let tag_count: usize = groups.iter().map(|group| group.tags.len()).sum();

    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            TAG_GROUPS_KEY,
            serde_json::to_string(&groups)?,
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    fs::rename(&json_path, &backup_path)?;

    tracing::info!(
        target: "storage",
        "Migration completed: {} groups, {} tags migrated",
        groups.len(),
        tag_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{init_database, SqliteTagStore};
    use crate::tags::library::TagLibraryStore;
    use std::sync::Arc;

    const LEGACY: &str = r##"[
        {"id": "default", "name": "Default", "defaultColor": "#607d8b", "tags": []},
        {"id": "g1", "name": "Work", "tags": [
            {"id": "t1", "name": "urgent", "color": "#ff0000"}
        ]}
    ]"##;

    #[test]
    fn test_legacy_json_is_imported_once() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(LEGACY_FILE), LEGACY).unwrap();

        let db = Arc::new(init_database(tmp.path()).unwrap());
        assert!(!tmp.path().join(LEGACY_FILE).exists());
        assert!(tmp.path().join("tag-groups.json.bak").exists());

        let groups = SqliteTagStore::new(db).load_tag_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].tags[0].group_id, "g1");
        assert_eq!(groups[1].tags[0].text_color, DEFAULT_TEXT_COLOR);
        assert_eq!(groups[1].default_color, DEFAULT_GROUP_COLOR);
    }

    #[test]
    fn test_legacy_json_skipped_when_library_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Arc::new(init_database(tmp.path()).unwrap());
        let store = SqliteTagStore::new(db.clone());
        store.save_tag_groups(&[TagGroup::default_group()]).unwrap();

        fs::write(tmp.path().join(LEGACY_FILE), LEGACY).unwrap();
        {
            let conn = db.0.lock().unwrap();
            migrate_legacy_json(&conn, tmp.path()).unwrap();
        }

        assert_eq!(store.load_tag_groups().unwrap().len(), 1);
        assert!(tmp.path().join("tag-groups.json.bak").exists());
    }
}
