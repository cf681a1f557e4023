//! Top-level owner of the tag library, the file tag index and the filter.
//!
//! Components get the controller by reference and subscribe to
//! [`TagEvent`]s instead of reaching into shared module state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};

use crate::core::watch::SelfWrites;
use crate::files::fs::{DeleteMode, FileSystem, FsError};
use crate::files::ops::{self, BatchReport};
use crate::shared::errors::StorageError;
use crate::tags::filter::{filter_by_tags, TagFilter};
use crate::tags::index::{self, apply_rename, clear_scanned, merge_index, ScanMode};
use crate::tags::library::{LibraryError, TagLibrary, TagLibraryStore};
use crate::tags::mutation::{self, MutationOutcome};
use crate::tags::types::{FileItem, LibraryTag, Tag, TagGroup, TagIndex};

const EVENT_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Fs(#[from] FsError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TagEvent {
    LibraryChanged,
    #[serde(rename_all = "camelCase")]
    IndexRebuilt { root: PathBuf, tagged: usize },
    IndexUpdated {
        removed: Vec<PathBuf>,
        inserted: Vec<PathBuf>,
    },
    FilterChanged { filter: TagFilter },
}

/// One async mutex per path so edits to the same file run one after another.
#[derive(Default)]
struct PathLocks(std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>);

impl PathLocks {
    async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct TagController<F: FileSystem, S: TagLibraryStore> {
    fs: F,
    store: S,
    library: RwLock<TagLibrary>,
    index: RwLock<TagIndex>,
    filter: RwLock<TagFilter>,
    events: broadcast::Sender<TagEvent>,
    locks: PathLocks,
    self_writes: SelfWrites,
}

impl<F: FileSystem, S: TagLibraryStore> TagController<F, S> {
    pub fn new(fs: F, store: S) -> Result<Self, ControllerError> {
        let library = TagLibrary::load(&store)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tracing::info!(
            target: "tags",
            "Tag controller initialized: {} groups, {} tags",
            library.groups().len(),
            library.all_tags().count()
        );

        Ok(Self {
            fs,
            store,
            library: RwLock::new(library),
            index: RwLock::new(TagIndex::new()),
            filter: RwLock::new(TagFilter::default()),
            events,
            locks: PathLocks::default(),
            self_writes: SelfWrites::default(),
        })
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TagEvent> {
        self.events.subscribe()
    }

    /// Registry of paths this controller renamed; hand it to the watcher.
    pub fn self_writes(&self) -> SelfWrites {
        self.self_writes.clone()
    }

    fn emit(&self, event: TagEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn library(&self) -> TagLibrary {
        self.library.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn groups(&self) -> Vec<TagGroup> {
        self.library
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .groups()
            .to_vec()
    }

    pub fn index(&self) -> TagIndex {
        self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Indexed tags for a path; empty when the file has none.
    pub fn tags_for(&self, path: &Path) -> Vec<Tag> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index::tags_for(&index, path).to_vec()
    }

    pub fn filter(&self) -> TagFilter {
        self.filter.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_filter(&self, filter: TagFilter) {
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = filter.clone();
        self.emit(TagEvent::FilterChanged { filter });
    }

    /// Applies the current filter to a listing.
    pub fn filtered<'a>(&self, files: &'a [FileItem]) -> Vec<&'a FileItem> {
        let filter = self.filter();
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        filter_by_tags(files, &index, &filter)
    }

    /// Re-reads the library from the store. A failed read keeps the cached copy.
    pub fn reload_library(&self) -> Vec<TagGroup> {
        match TagLibrary::load(&self.store) {
            Ok(fresh) => {
                let mut library = self.library.write().unwrap_or_else(PoisonError::into_inner);
                let changed = *library != fresh;
                *library = fresh;
                let groups = library.groups().to_vec();
                drop(library);
                if changed {
                    self.emit(TagEvent::LibraryChanged);
                }
                groups
            }
            Err(e) => {
                tracing::warn!(target: "tags", error = %e, "Failed to reload tag library, using cached copy");
                self.groups()
            }
        }
    }

    /// Lists `root` and replaces the index entries that listing covers.
    pub async fn scan(&self, root: &Path, mode: ScanMode) -> Result<Vec<FileItem>, ControllerError> {
        let groups = self.reload_library();
        let result = match mode {
            ScanMode::Shallow => index::shallow_scan(&self.fs, root, &groups).await?,
            ScanMode::Recursive => index::recursive_scan(&self.fs, root, &groups).await?,
        };
        let tagged = result.index.len();

        {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            clear_scanned(&mut index, root, mode);
            let current = std::mem::take(&mut *index);
            *index = merge_index(current, result.index);
        }

        self.emit(TagEvent::IndexRebuilt {
            root: root.to_path_buf(),
            tagged,
        });
        Ok(result.files)
    }

    fn commit(&self, outcome: &MutationOutcome) {
        if !outcome.renamed() {
            return;
        }

        self.self_writes.record(outcome.old_path.clone());
        self.self_writes.record(outcome.new_path.clone());

        let groups = self.groups();
        let inserted = {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            apply_rename(&mut index, &outcome.old_path, &outcome.new_path, &groups);
            index.contains_key(&outcome.new_path)
        };

        self.emit(TagEvent::IndexUpdated {
            removed: vec![outcome.old_path.clone()],
            inserted: if inserted {
                vec![outcome.new_path.clone()]
            } else {
                Vec::new()
            },
        });
    }

    /// Sets the complete ordered tag list of a file.
    pub async fn set_tags<T: AsRef<str>>(&self, path: &Path, tag_names: &[T]) -> MutationOutcome {
        let _guard = self.locks.acquire(path).await;
        let outcome = mutation::mutate_tags(&self.fs, path, tag_names).await;
        self.commit(&outcome);
        outcome
    }

    pub async fn add_tag(&self, path: &Path, tag_name: &str) -> MutationOutcome {
        let _guard = self.locks.acquire(path).await;
        let outcome = mutation::add_tag(&self.fs, path, tag_name).await;
        self.commit(&outcome);
        outcome
    }

    pub async fn remove_tag(&self, path: &Path, tag_name: &str) -> MutationOutcome {
        let _guard = self.locks.acquire(path).await;
        let outcome = mutation::remove_tag(&self.fs, path, tag_name).await;
        self.commit(&outcome);
        outcome
    }

    pub async fn reorder_tag(&self, path: &Path, from: usize, to: usize) -> MutationOutcome {
        let _guard = self.locks.acquire(path).await;
        let outcome = mutation::reorder_tag(&self.fs, path, from, to).await;
        self.commit(&outcome);
        outcome
    }

    /// Accepts the name offered for a conflicted mutation.
    pub async fn confirm_suggestion(&self, path: &Path, suggestion: &Path) -> MutationOutcome {
        let _guard = self.locks.acquire(path).await;
        let outcome = mutation::confirm_suggestion(&self.fs, path, suggestion).await;
        self.commit(&outcome);
        outcome
    }

    /// Plain rename of a file, outside the tag pipeline.
    pub async fn rename_file(&self, path: &Path, new_name: &str) -> Result<PathBuf, ControllerError> {
        let _guard = self.locks.acquire(path).await;
        let target = ops::rename_entry(&self.fs, path, new_name).await?;
        let outcome = MutationOutcome {
            state: mutation::MutationState::Committed,
            old_path: path.to_path_buf(),
            new_path: target.clone(),
            suggestion: None,
            error: None,
            error_kind: None,
        };
        self.commit(&outcome);
        Ok(target)
    }

    pub async fn move_entries(&self, sources: &[PathBuf], dest_dir: &Path) -> BatchReport {
        let report = ops::move_entries(&self.fs, sources, dest_dir).await;
        self.reindex_transfers(sources, dest_dir, &report, true);
        report
    }

    pub async fn copy_entries(&self, sources: &[PathBuf], dest_dir: &Path) -> BatchReport {
        let report = ops::copy_entries(&self.fs, sources, dest_dir).await;
        self.reindex_transfers(sources, dest_dir, &report, false);
        report
    }

    pub async fn delete_entries(&self, paths: &[PathBuf], mode: DeleteMode) -> BatchReport {
        let report = ops::delete_entries(&self.fs, paths, mode).await;

        let removed: Vec<PathBuf> = {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            let before: Vec<PathBuf> = index.keys().cloned().collect();
            index.retain(|path, _| !report.succeeded.iter().any(|gone| path.starts_with(gone)));
            before.into_iter().filter(|path| !index.contains_key(path)).collect()
        };

        if !removed.is_empty() {
            self.emit(TagEvent::IndexUpdated {
                removed,
                inserted: Vec::new(),
            });
        }
        report
    }

    /// Re-keys index entries under each transferred source to their place
    /// under `dest_dir`. Tags live in file names, which a transfer keeps.
    fn reindex_transfers(&self, sources: &[PathBuf], dest_dir: &Path, report: &BatchReport, moved: bool) {
        let mut removed = Vec::new();
        let mut inserted = Vec::new();

        {
            let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
            for source in sources {
                let Some(name) = source.file_name() else {
                    continue;
                };
                let destination = dest_dir.join(name);
                if !report.succeeded.contains(&destination) {
                    continue;
                }
                if moved {
                    self.self_writes.record(source.clone());
                }

                let carried: Vec<(PathBuf, PathBuf, Vec<Tag>)> = index
                    .iter()
                    .filter_map(|(path, tags)| {
                        let rel = path.strip_prefix(source).ok()?;
                        let target = if rel.as_os_str().is_empty() {
                            destination.clone()
                        } else {
                            destination.join(rel)
                        };
                        Some((path.clone(), target, tags.clone()))
                    })
                    .collect();

                if moved {
                    for (path, _, _) in &carried {
                        index.remove(path);
                        removed.push(path.clone());
                    }
                }
                for (_, target, tags) in carried {
                    index.insert(target.clone(), tags);
                    inserted.push(target);
                }
            }
        }

        if !removed.is_empty() || !inserted.is_empty() {
            self.emit(TagEvent::IndexUpdated { removed, inserted });
        }
    }

    /// Runs a library edit against a freshly loaded copy, persists it and
    /// swaps it in.
    fn edit_library<T>(
        &self,
        edit: impl FnOnce(&mut TagLibrary) -> Result<T, LibraryError>,
    ) -> Result<T, ControllerError> {
        let mut library = self.library.write().unwrap_or_else(PoisonError::into_inner);
        let mut working = match TagLibrary::load(&self.store) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(target: "tags", error = %e, "Editing cached tag library");
                library.clone()
            }
        };

        let result = edit(&mut working)?;
        working.save(&self.store)?;
        *library = working;
        drop(library);

        self.emit(TagEvent::LibraryChanged);
        Ok(result)
    }

    pub fn create_group(
        &self,
        name: &str,
        default_color: &str,
        description: Option<String>,
    ) -> Result<TagGroup, ControllerError> {
        self.edit_library(|library| library.create_group(name, default_color, description))
    }

    pub fn update_group(
        &self,
        id: &str,
        name: &str,
        default_color: &str,
        description: Option<String>,
    ) -> Result<(), ControllerError> {
        self.edit_library(|library| library.update_group(id, name, default_color, description))
    }

    pub fn delete_group(&self, id: &str) -> Result<TagGroup, ControllerError> {
        self.edit_library(|library| library.delete_group(id))
    }

    pub fn create_tag(
        &self,
        group_id: &str,
        name: &str,
        color: Option<&str>,
        text_color: Option<&str>,
    ) -> Result<LibraryTag, ControllerError> {
        self.edit_library(|library| library.create_tag(group_id, name, color, text_color))
    }

    pub fn update_tag(
        &self,
        id: &str,
        name: Option<&str>,
        color: Option<&str>,
        text_color: Option<&str>,
    ) -> Result<LibraryTag, ControllerError> {
        self.edit_library(|library| library.update_tag(id, name, color, text_color))
    }

    pub fn delete_tag(&self, id: &str) -> Result<LibraryTag, ControllerError> {
        self.edit_library(|library| library.delete_tag(id))
    }

    pub fn move_tag(&self, id: &str, target_group_id: &str) -> Result<LibraryTag, ControllerError> {
        self.edit_library(|library| library.move_tag(id, target_group_id))
    }

    pub fn reorder_library_tags(&self, group_id: &str, ordered_ids: &[String]) -> Result<(), ControllerError> {
        self.edit_library(|library| library.reorder_tags(group_id, ordered_ids))
    }
}
