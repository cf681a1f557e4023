//! Tag write path: compute the new filename and rename the file.
//!
//! Every add/remove/reorder is expressed as "here is the complete ordered
//! tag list", then runs through the same state machine:
//! `Requested -> Validated -> Renaming -> {Committed | Conflicted | Failed}`.
//! The current tags are always read from the filename being renamed.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::codec::{compose_filename, get_display_name, parse_tag_tokens};
use super::resolve::match_key;
use crate::files::fs::{FileSystem, FsErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Requested,
    Validated,
    Renaming,
    Committed,
    Conflicted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub state: MutationState,
    pub old_path: PathBuf,
    /// Path the file has (committed) or would have had (conflicted/failed).
    pub new_path: PathBuf,
    /// Non-colliding alternative offered when the target already exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_kind: Option<FsErrorKind>,
}

impl MutationOutcome {
    fn new(state: MutationState, old_path: &Path, new_path: PathBuf) -> Self {
        Self {
            state,
            old_path: old_path.to_path_buf(),
            new_path,
            suggestion: None,
            error: None,
            error_kind: None,
        }
    }

    fn failed(old_path: &Path, new_path: PathBuf, kind: FsErrorKind, error: String) -> Self {
        Self {
            error: Some(error),
            error_kind: Some(kind),
            ..Self::new(MutationState::Failed, old_path, new_path)
        }
    }

    pub fn is_committed(&self) -> bool {
        self.state == MutationState::Committed
    }

    /// Whether the file actually moved to a new path.
    pub fn renamed(&self) -> bool {
        self.is_committed() && self.old_path != self.new_path
    }
}

pub fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

/// First `"<stem> (n).<ext>"` sibling of `target` that does not exist yet.
pub async fn suggest_available_name<F: FileSystem>(fs: &F, target: &Path) -> Option<PathBuf> {
    let name = file_name_of(target)?;
    let (stem, extension) = split_extension(&name);

    let mut counter = 1u32;
    loop {
        let candidate_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        let candidate = target.with_file_name(candidate_name);
        if !fs.exists(&candidate).await {
            return Some(candidate);
        }
        counter = counter.checked_add(1)?;
    }
}

async fn conflicted<F: FileSystem>(fs: &F, path: &Path, target: PathBuf) -> MutationOutcome {
    let suggestion = suggest_available_name(fs, &target).await;
    tracing::info!(
        target: "tags::mutation",
        path = %path.display(),
        target = %target.display(),
        suggestion = ?suggestion,
        "Rename target already exists"
    );
    MutationOutcome {
        suggestion,
        error: Some(format!("A file named {:?} already exists", file_name_of(&target).unwrap_or_default())),
        error_kind: Some(FsErrorKind::DestinationExists),
        ..MutationOutcome::new(MutationState::Conflicted, path, target)
    }
}

async fn rename_to<F: FileSystem>(fs: &F, path: &Path, target: PathBuf) -> MutationOutcome {
    tracing::debug!(
        target: "tags::mutation",
        state = ?MutationState::Renaming,
        from = %path.display(),
        to = %target.display()
    );

    if fs.exists(&target).await && !fs.same_entry(path, &target).await {
        return conflicted(fs, path, target).await;
    }

    match fs.rename_entry(path, &target).await {
        Ok(()) => {
            tracing::info!(
                target: "tags::mutation",
                from = %path.display(),
                to = %target.display(),
                "Tags written"
            );
            MutationOutcome::new(MutationState::Committed, path, target)
        }
        Err(e) if e.kind == FsErrorKind::DestinationExists => conflicted(fs, path, target).await,
        Err(e) => {
            tracing::warn!(
                target: "tags::mutation",
                path = %path.display(),
                error = %e,
                "Tag rename failed"
            );
            MutationOutcome::failed(path, target, e.kind, e.message)
        }
    }
}

/// Rewrites `path` so its tag block holds exactly `tag_names`, in order.
pub async fn mutate_tags<F: FileSystem, S: AsRef<str>>(
    fs: &F,
    path: &Path,
    tag_names: &[S],
) -> MutationOutcome {
    tracing::debug!(target: "tags::mutation", state = ?MutationState::Requested, path = %path.display());

    let Some(current_name) = file_name_of(path) else {
        return MutationOutcome::failed(
            path,
            path.to_path_buf(),
            FsErrorKind::Other,
            format!("Not a file path: {}", path.display()),
        );
    };

    let target_name = compose_filename(&get_display_name(&current_name), tag_names);
    tracing::debug!(
        target: "tags::mutation",
        state = ?MutationState::Validated,
        current = %current_name,
        target_name = %target_name
    );

    if target_name == current_name {
        return MutationOutcome::new(MutationState::Committed, path, path.to_path_buf());
    }

    rename_to(fs, path, path.with_file_name(target_name)).await
}

/// Retries a conflicted mutation with the name the user accepted.
pub async fn confirm_suggestion<F: FileSystem>(fs: &F, path: &Path, suggestion: &Path) -> MutationOutcome {
    if suggestion.parent() != path.parent() {
        return MutationOutcome::failed(
            path,
            suggestion.to_path_buf(),
            FsErrorKind::Other,
            "Suggested name must stay in the same folder".to_string(),
        );
    }
    rename_to(fs, path, suggestion.to_path_buf()).await
}

/// Tag tokens currently encoded in the file's name.
pub fn current_tags(path: &Path) -> Vec<String> {
    file_name_of(path)
        .map(|name| parse_tag_tokens(&name))
        .unwrap_or_default()
}

/// Appends a tag unless the file already has it (case-insensitive).
pub async fn add_tag<F: FileSystem>(fs: &F, path: &Path, tag_name: &str) -> MutationOutcome {
    let mut tags = current_tags(path);
    let key = match_key(tag_name);
    if !tags.iter().any(|tag| match_key(tag) == key) {
        tags.push(tag_name.to_string());
    }
    mutate_tags(fs, path, &tags).await
}

/// Removes every occurrence of a tag (case-insensitive).
pub async fn remove_tag<F: FileSystem>(fs: &F, path: &Path, tag_name: &str) -> MutationOutcome {
    let key = match_key(tag_name);
    let tags: Vec<String> = current_tags(path)
        .into_iter()
        .filter(|tag| match_key(tag) != key)
        .collect();
    mutate_tags(fs, path, &tags).await
}

/// Moves the tag at `from` to position `to`. Out-of-range indexes are clamped.
pub async fn reorder_tag<F: FileSystem>(fs: &F, path: &Path, from: usize, to: usize) -> MutationOutcome {
    let mut tags = current_tags(path);
    if from < tags.len() {
        let tag = tags.remove(from);
        let to = to.min(tags.len());
        tags.insert(to, tag);
    }
    mutate_tags(fs, path, &tags).await
}
