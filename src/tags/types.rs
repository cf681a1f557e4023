use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Id of the group that always exists and cannot be deleted.
pub const DEFAULT_GROUP_ID: &str = "default";
/// Group id reported by synthesized tags.
pub const TEMPORARY_GROUP_ID: &str = "temporary";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_GROUP_COLOR: &str = "#607d8b";

/// A tag persisted in the library, owned by a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryTag {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub group_id: String,
}

/// A tag synthesized for a bracket token with no library match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryTag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub text_color: String,
}

/// A resolved tag as shown on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Tag {
    Library(LibraryTag),
    Temporary(TemporaryTag),
}

impl Tag {
    pub fn id(&self) -> &str {
        match self {
            Tag::Library(tag) => &tag.id,
            Tag::Temporary(tag) => &tag.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tag::Library(tag) => &tag.name,
            Tag::Temporary(tag) => &tag.name,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Tag::Library(tag) => &tag.color,
            Tag::Temporary(tag) => &tag.color,
        }
    }

    pub fn text_color(&self) -> &str {
        match self {
            Tag::Library(tag) => &tag.text_color,
            Tag::Temporary(tag) => &tag.text_color,
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            Tag::Library(tag) => &tag.group_id,
            Tag::Temporary(_) => TEMPORARY_GROUP_ID,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Tag::Temporary(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub id: String,
    pub name: String,
    pub default_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<LibraryTag>,
}

impl TagGroup {
    pub fn default_group() -> Self {
        Self {
            id: DEFAULT_GROUP_ID.to_string(),
            name: "Default".to_string(),
            default_color: DEFAULT_GROUP_COLOR.to_string(),
            description: None,
            tags: Vec::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_GROUP_ID
    }
}

/// Snapshot of one directory entry as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Absolute path -> ordered resolved tags. Files without tags have no entry.
pub type TagIndex = HashMap<PathBuf, Vec<Tag>>;

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}
