//! Derived path -> tags index, rebuilt from directory listings.
//!
//! The index is display-only. Writes always re-derive tags from the
//! filename on disk, never from here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::codec::parse_tag_tokens;
use super::resolve::resolve_tokens;
use super::types::{FileItem, Tag, TagGroup, TagIndex};
use crate::files::fs::{FileSystem, FsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Shallow,
    Recursive,
}

/// Resolved tags for one filename, or `None` when it carries no tokens.
pub fn tags_for_name(name: &str, groups: &[TagGroup]) -> Option<Vec<Tag>> {
    let tokens = parse_tag_tokens(name);
    if tokens.is_empty() {
        return None;
    }
    Some(resolve_tokens(&tokens, groups))
}

/// Indexes every non-directory file that carries at least one tag token.
pub fn build_index(files: &[FileItem], groups: &[TagGroup]) -> TagIndex {
    files
        .iter()
        .filter(|file| !file.is_directory)
        .filter_map(|file| tags_for_name(&file.name, groups).map(|tags| (file.path.clone(), tags)))
        .collect()
}

/// Overlays `partial` onto `existing`; keys not in `partial` are untouched.
pub fn merge_index(mut existing: TagIndex, partial: TagIndex) -> TagIndex {
    existing.extend(partial);
    existing
}

/// Tags for a path. A missing entry means the file has no tags.
pub fn tags_for<'a>(index: &'a TagIndex, path: &Path) -> &'a [Tag] {
    index.get(path).map(Vec::as_slice).unwrap_or(&[])
}

/// Targeted change after a rename: drop the old key, index the new path.
pub fn apply_rename(index: &mut TagIndex, old_path: &Path, new_path: &Path, groups: &[TagGroup]) {
    index.remove(old_path);
    let name = new_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if let Some(tags) = tags_for_name(&name, groups) {
        index.insert(new_path.to_path_buf(), tags);
    }
}

/// Drops every entry a scan of `root` would have produced, so a fresh scan
/// result replaces them wholesale.
pub fn clear_scanned(index: &mut TagIndex, root: &Path, mode: ScanMode) {
    index.retain(|path, _| match mode {
        ScanMode::Shallow => path.parent() != Some(root),
        ScanMode::Recursive => !path.starts_with(root),
    });
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<FileItem>,
    pub index: TagIndex,
}

pub async fn scan<F: FileSystem>(
    fs: &F,
    root: &Path,
    mode: ScanMode,
    groups: &[TagGroup],
) -> Result<ScanResult, FsError> {
    let files = match mode {
        ScanMode::Shallow => fs.list_directory(root).await?,
        ScanMode::Recursive => fs.list_directory_recursive(root).await?,
    };
    let index = build_index(&files, groups);

    tracing::debug!(
        target: "tags",
        root = %root.display(),
        mode = ?mode,
        files = files.len(),
        tagged = index.len(),
        "Scan finished"
    );

    Ok(ScanResult { files, index })
}

pub async fn shallow_scan<F: FileSystem>(fs: &F, root: &Path, groups: &[TagGroup]) -> Result<ScanResult, FsError> {
    scan(fs, root, ScanMode::Shallow, groups).await
}

pub async fn recursive_scan<F: FileSystem>(fs: &F, root: &Path, groups: &[TagGroup]) -> Result<ScanResult, FsError> {
    scan(fs, root, ScanMode::Recursive, groups).await
}

/// Paths of indexed files, sorted, handy for stable output.
pub fn indexed_paths(index: &TagIndex) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = index.keys().cloned().collect();
    paths.sort();
    paths
}
