//! The tag library: named groups of tags with colors, and its persistence seam.

use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use super::codec::sanitize_tag_name;
use super::resolve::match_key;
use super::types::{LibraryTag, TagGroup, DEFAULT_GROUP_ID, DEFAULT_TEXT_COLOR};
use crate::shared::errors::StorageError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),
    #[error("Tag not found: {0}")]
    TagNotFound(String),
    #[error("The default group cannot be deleted")]
    ProtectedGroup,
    #[error("Tag name already exists in this group: {0}")]
    DuplicateName(String),
    #[error("Name cannot be empty")]
    EmptyName,
}

/// Persistence seam for the library. Implementations store the groups as an
/// opaque blob; callers re-read before every scan.
pub trait TagLibraryStore: Send + Sync {
    fn load_tag_groups(&self) -> Result<Vec<TagGroup>, StorageError>;
    fn save_tag_groups(&self, groups: &[TagGroup]) -> Result<(), StorageError>;
}

/// In-process store, used by tests and as a fallback when no database is available.
#[derive(Default)]
pub struct MemoryTagStore(Mutex<Vec<TagGroup>>);

impl MemoryTagStore {
    pub fn new(groups: Vec<TagGroup>) -> Self {
        Self(Mutex::new(groups))
    }
}

impl TagLibraryStore for MemoryTagStore {
    fn load_tag_groups(&self) -> Result<Vec<TagGroup>, StorageError> {
        let groups = self.0.lock().map_err(|e| StorageError::lock(e.to_string()))?;
        Ok(groups.clone())
    }

    fn save_tag_groups(&self, groups: &[TagGroup]) -> Result<(), StorageError> {
        let mut stored = self.0.lock().map_err(|e| StorageError::lock(e.to_string()))?;
        *stored = groups.to_vec();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLibrary {
    groups: Vec<TagGroup>,
}

impl Default for TagLibrary {
    fn default() -> Self {
        Self {
            groups: vec![TagGroup::default_group()],
        }
    }
}

impl TagLibrary {
    /// Builds a library from stored groups, restoring the default group and
    /// each tag's owning group id.
    pub fn from_groups(mut groups: Vec<TagGroup>) -> Self {
        if !groups.iter().any(TagGroup::is_default) {
            groups.insert(0, TagGroup::default_group());
        }
        for group in &mut groups {
            for tag in &mut group.tags {
                tag.group_id = group.id.clone();
            }
        }
        Self { groups }
    }

    pub fn load(store: &dyn TagLibraryStore) -> Result<Self, StorageError> {
        Ok(Self::from_groups(store.load_tag_groups()?))
    }

    pub fn save(&self, store: &dyn TagLibraryStore) -> Result<(), StorageError> {
        store.save_tag_groups(&self.groups)
    }

    pub fn groups(&self) -> &[TagGroup] {
        &self.groups
    }

    pub fn all_tags(&self) -> impl Iterator<Item = &LibraryTag> {
        self.groups.iter().flat_map(|group| group.tags.iter())
    }

    /// First tag with this name in group order, case-insensitive.
    pub fn find_tag_by_name(&self, name: &str) -> Option<&LibraryTag> {
        let key = match_key(name);
        self.all_tags().find(|tag| match_key(&tag.name) == key)
    }

    pub fn find_tag(&self, id: &str) -> Option<&LibraryTag> {
        self.all_tags().find(|tag| tag.id == id)
    }

    fn group_mut(&mut self, id: &str) -> Result<&mut TagGroup, LibraryError> {
        self.groups
            .iter_mut()
            .find(|group| group.id == id)
            .ok_or_else(|| LibraryError::GroupNotFound(id.to_string()))
    }

    fn locate_tag(&self, id: &str) -> Result<(usize, usize), LibraryError> {
        self.groups
            .iter()
            .enumerate()
            .find_map(|(g, group)| {
                group
                    .tags
                    .iter()
                    .position(|tag| tag.id == id)
                    .map(|t| (g, t))
            })
            .ok_or_else(|| LibraryError::TagNotFound(id.to_string()))
    }

    fn ensure_unique(group: &TagGroup, name: &str, except_id: Option<&str>) -> Result<(), LibraryError> {
        let key = match_key(name);
        let clash = group
            .tags
            .iter()
            .any(|tag| Some(tag.id.as_str()) != except_id && match_key(&tag.name) == key);
        if clash {
            return Err(LibraryError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn clean_name(name: &str) -> Result<String, LibraryError> {
        let name = sanitize_tag_name(name);
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }
        Ok(name)
    }

    pub fn create_group(
        &mut self,
        name: &str,
        default_color: &str,
        description: Option<String>,
    ) -> Result<TagGroup, LibraryError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }

        let group = TagGroup {
            id: Uuid::new_v4().to_string(),
            name,
            default_color: default_color.to_string(),
            description,
            tags: Vec::new(),
        };
        self.groups.push(group.clone());
        Ok(group)
    }

    pub fn update_group(
        &mut self,
        id: &str,
        name: &str,
        default_color: &str,
        description: Option<String>,
    ) -> Result<(), LibraryError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(LibraryError::EmptyName);
        }

        let group = self.group_mut(id)?;
        group.name = name;
        group.default_color = default_color.to_string();
        group.description = description;
        Ok(())
    }

    /// Deletes a group and every tag in it. Files carrying those names fall
    /// back to temporary tags on the next scan.
    pub fn delete_group(&mut self, id: &str) -> Result<TagGroup, LibraryError> {
        if id == DEFAULT_GROUP_ID {
            return Err(LibraryError::ProtectedGroup);
        }
        let position = self
            .groups
            .iter()
            .position(|group| group.id == id)
            .ok_or_else(|| LibraryError::GroupNotFound(id.to_string()))?;
        Ok(self.groups.remove(position))
    }

    pub fn create_tag(
        &mut self,
        group_id: &str,
        name: &str,
        color: Option<&str>,
        text_color: Option<&str>,
    ) -> Result<LibraryTag, LibraryError> {
        let name = Self::clean_name(name)?;
        let group = self.group_mut(group_id)?;
        Self::ensure_unique(group, &name, None)?;

        let tag = LibraryTag {
            id: Uuid::new_v4().to_string(),
            name,
            color: color.unwrap_or(group.default_color.as_str()).to_string(),
            text_color: text_color.unwrap_or(DEFAULT_TEXT_COLOR).to_string(),
            group_id: group.id.clone(),
        };
        group.tags.push(tag.clone());
        Ok(tag)
    }

    pub fn update_tag(
        &mut self,
        id: &str,
        name: Option<&str>,
        color: Option<&str>,
        text_color: Option<&str>,
    ) -> Result<LibraryTag, LibraryError> {
        let (g, t) = self.locate_tag(id)?;
        let name = name.map(Self::clean_name).transpose()?;
        if let Some(name) = &name {
            Self::ensure_unique(&self.groups[g], name, Some(id))?;
        }

        let tag = &mut self.groups[g].tags[t];
        if let Some(name) = name {
            tag.name = name;
        }
        if let Some(color) = color {
            tag.color = color.to_string();
        }
        if let Some(text_color) = text_color {
            tag.text_color = text_color.to_string();
        }
        Ok(tag.clone())
    }

    pub fn delete_tag(&mut self, id: &str) -> Result<LibraryTag, LibraryError> {
        let (g, t) = self.locate_tag(id)?;
        Ok(self.groups[g].tags.remove(t))
    }

    pub fn move_tag(&mut self, id: &str, target_group_id: &str) -> Result<LibraryTag, LibraryError> {
        let (g, t) = self.locate_tag(id)?;
        let target = self
            .groups
            .iter()
            .position(|group| group.id == target_group_id)
            .ok_or_else(|| LibraryError::GroupNotFound(target_group_id.to_string()))?;
        if target == g {
            return Ok(self.groups[g].tags[t].clone());
        }
        Self::ensure_unique(&self.groups[target], &self.groups[g].tags[t].name, None)?;

        let mut tag = self.groups[g].tags.remove(t);
        tag.group_id = target_group_id.to_string();
        self.groups[target].tags.push(tag.clone());
        Ok(tag)
    }

    /// Reorders a group's tags. Ids missing from `ordered_ids` keep their
    /// relative order after the listed ones; unknown ids are ignored.
    pub fn reorder_tags(&mut self, group_id: &str, ordered_ids: &[String]) -> Result<(), LibraryError> {
        let group = self.group_mut(group_id)?;
        let mut remaining = std::mem::take(&mut group.tags);
        let mut ordered = Vec::with_capacity(remaining.len());

        for id in ordered_ids {
            if let Some(pos) = remaining.iter().position(|tag| &tag.id == id) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);
        group.tags = ordered;
        Ok(())
    }
}
