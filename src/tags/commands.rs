//! Command surface over [`TagController`]: owned arguments in, serializable
//! results out, errors flattened to strings for the caller.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::codec::get_display_name;
use super::filter::{search_by_name, MatchMode, TagFilter};
use super::index::ScanMode;
use super::library::TagLibraryStore;
use super::mutation::MutationOutcome;
use super::types::{FileItem, LibraryTag, Tag, TagGroup};
use crate::controller::TagController;
use crate::files::fs::{DeleteMode, FileSystem};
use crate::files::ops::BatchReport;

/// A listed file with its display name and resolved tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    #[serde(flatten)]
    pub file: FileItem,
    pub display_name: String,
    pub tags: Vec<Tag>,
}

fn scan_mode(recursive: bool) -> ScanMode {
    if recursive {
        ScanMode::Recursive
    } else {
        ScanMode::Shallow
    }
}

/// Scans `dir`, then applies the active tag filter and an optional name query.
pub async fn files_list<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    dir: String,
    recursive: bool,
    query: Option<String>,
) -> Result<Vec<FileEntry>, String> {
    let files = ctl
        .scan(Path::new(&dir), scan_mode(recursive))
        .await
        .map_err(|e| e.to_string())?;

    let visible: Vec<FileItem> = ctl.filtered(&files).into_iter().cloned().collect();
    let matched = match query.as_deref() {
        Some(query) => search_by_name(&visible, query),
        None => visible.iter().collect(),
    };

    Ok(matched
        .into_iter()
        .map(|file| FileEntry {
            display_name: get_display_name(&file.name),
            tags: ctl.tags_for(&file.path),
            file: file.clone(),
        })
        .collect())
}

pub fn file_tags<F: FileSystem, S: TagLibraryStore>(ctl: &TagController<F, S>, path: String) -> Vec<Tag> {
    ctl.tags_for(Path::new(&path))
}

pub async fn file_set_tags<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    tags: Vec<String>,
) -> MutationOutcome {
    ctl.set_tags(Path::new(&path), &tags).await
}

pub async fn file_add_tag<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    tag: String,
) -> MutationOutcome {
    ctl.add_tag(Path::new(&path), &tag).await
}

pub async fn file_remove_tag<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    tag: String,
) -> MutationOutcome {
    ctl.remove_tag(Path::new(&path), &tag).await
}

pub async fn file_reorder_tag<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    from: usize,
    to: usize,
) -> MutationOutcome {
    ctl.reorder_tag(Path::new(&path), from, to).await
}

pub async fn file_confirm_rename<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    suggestion: String,
) -> MutationOutcome {
    ctl.confirm_suggestion(Path::new(&path), Path::new(&suggestion)).await
}

pub async fn file_rename<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    path: String,
    new_name: String,
) -> Result<String, String> {
    let new_name = new_name.trim().to_string();
    if new_name.is_empty() {
        return Err("File name cannot be empty".to_string());
    }

    ctl.rename_file(Path::new(&path), &new_name)
        .await
        .map(|target| target.to_string_lossy().to_string())
        .map_err(|e| e.to_string())
}

fn to_paths(paths: Vec<String>) -> Vec<PathBuf> {
    paths.into_iter().map(PathBuf::from).collect()
}

pub async fn files_move<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    paths: Vec<String>,
    dest_dir: String,
) -> BatchReport {
    ctl.move_entries(&to_paths(paths), Path::new(&dest_dir)).await
}

pub async fn files_copy<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    paths: Vec<String>,
    dest_dir: String,
) -> BatchReport {
    ctl.copy_entries(&to_paths(paths), Path::new(&dest_dir)).await
}

pub async fn files_delete<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    paths: Vec<String>,
    mode: DeleteMode,
) -> BatchReport {
    ctl.delete_entries(&to_paths(paths), mode).await
}

pub fn filter_set<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    names: Vec<String>,
    mode: MatchMode,
) {
    let names = names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    ctl.set_filter(TagFilter { names, mode });
}

pub fn filter_clear<F: FileSystem, S: TagLibraryStore>(ctl: &TagController<F, S>) {
    ctl.set_filter(TagFilter::default());
}

pub fn tag_groups_get<F: FileSystem, S: TagLibraryStore>(ctl: &TagController<F, S>) -> Vec<TagGroup> {
    ctl.reload_library()
}

pub fn tag_group_create<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    name: String,
    default_color: String,
    description: Option<String>,
) -> Result<TagGroup, String> {
    ctl.create_group(&name, &default_color, description)
        .map_err(|e| e.to_string())
}

pub fn tag_group_update<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    id: String,
    name: String,
    default_color: String,
    description: Option<String>,
) -> Result<(), String> {
    ctl.update_group(&id, &name, &default_color, description)
        .map_err(|e| e.to_string())
}

/// Deleting a group removes its tags from the library; files keep their
/// tokens, which then show up as temporary tags.
pub fn tag_group_delete<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    id: String,
) -> Result<(), String> {
    ctl.delete_group(&id).map(|_| ()).map_err(|e| e.to_string())
}

pub fn tag_create<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    group_id: String,
    name: String,
    color: Option<String>,
    text_color: Option<String>,
) -> Result<LibraryTag, String> {
    ctl.create_tag(&group_id, &name, color.as_deref(), text_color.as_deref())
        .map_err(|e| e.to_string())
}

pub fn tag_update<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    id: String,
    name: Option<String>,
    color: Option<String>,
    text_color: Option<String>,
) -> Result<LibraryTag, String> {
    ctl.update_tag(&id, name.as_deref(), color.as_deref(), text_color.as_deref())
        .map_err(|e| e.to_string())
}

pub fn tag_delete<F: FileSystem, S: TagLibraryStore>(ctl: &TagController<F, S>, id: String) -> Result<(), String> {
    ctl.delete_tag(&id).map(|_| ()).map_err(|e| e.to_string())
}

pub fn tag_move<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    id: String,
    group_id: String,
) -> Result<LibraryTag, String> {
    ctl.move_tag(&id, &group_id).map_err(|e| e.to_string())
}

pub fn tags_reorder<F: FileSystem, S: TagLibraryStore>(
    ctl: &TagController<F, S>,
    group_id: String,
    tag_ids: Vec<String>,
) -> Result<(), String> {
    ctl.reorder_library_tags(&group_id, &tag_ids)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::fs::LocalFileSystem;
    use crate::tags::library::MemoryTagStore;

    fn controller() -> TagController<LocalFileSystem, MemoryTagStore> {
        TagController::new(LocalFileSystem::new(), MemoryTagStore::default()).unwrap()
    }

    #[tokio::test]
    async fn test_files_list_with_filter_and_query() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("[work] plan.md"), "").unwrap();
        std::fs::write(tmp.path().join("[home] plan.md"), "").unwrap();
        std::fs::write(tmp.path().join("[work] notes.md"), "").unwrap();
        std::fs::create_dir(tmp.path().join("archive")).unwrap();

        let ctl = controller();
        let dir = tmp.path().to_string_lossy().to_string();

        let all = files_list(&ctl, dir.clone(), false, None).await.unwrap();
        assert_eq!(all.len(), 4);

        filter_set(&ctl, vec!["WORK".to_string(), " ".to_string()], MatchMode::All);
        assert_eq!(ctl.filter().names, vec!["WORK"]);

        let listed = files_list(&ctl, dir.clone(), false, Some("plan".to_string()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].display_name, "plan.md");
        assert_eq!(listed[0].tags[0].name(), "work");
        assert!(listed[0].tags[0].is_temporary());

        filter_clear(&ctl);
        let listed = files_list(&ctl, dir, false, None).await.unwrap();
        assert_eq!(listed.len(), 4);
    }

    #[tokio::test]
    async fn test_file_rename_rejects_empty_name() {
        let ctl = controller();
        let result = file_rename(&ctl, "/tmp/whatever.txt".to_string(), "  ".to_string()).await;
        assert_eq!(result, Err("File name cannot be empty".to_string()));
    }

    #[test]
    fn test_tag_group_lifecycle() {
        let ctl = controller();
        let group = tag_group_create(&ctl, "Work".to_string(), "#ff0000".to_string(), None).unwrap();
        let tag = tag_create(&ctl, group.id.clone(), "urgent".to_string(), None, None).unwrap();
        assert_eq!(tag.color, "#ff0000");

        let groups = tag_groups_get(&ctl);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].tags[0].name, "urgent");

        assert!(tag_group_delete(&ctl, "default".to_string()).is_err());
        tag_group_delete(&ctl, group.id).unwrap();
        assert_eq!(tag_groups_get(&ctl).len(), 1);
        assert!(tag_delete(&ctl, tag.id).unwrap_err().contains("not found"));
    }
}
