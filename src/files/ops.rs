//! Whole-file operations (move, copy, delete, rename) that never look at tags.
//!
//! Batches run per file: one failure is recorded and the rest continue.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::fs::{DeleteMode, FileSystem, FsError, FsErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEntry {
    pub path: PathBuf,
    pub error: String,
}

/// Final outcome of a batch: what went through and what did not, with reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Resulting paths: destinations for move/copy, removed paths for delete.
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<FailedEntry>,
}

impl BatchReport {
    fn fail(&mut self, path: &Path, error: impl Into<String>) {
        self.failed.push(FailedEntry {
            path: path.to_path_buf(),
            error: error.into(),
        });
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
enum Transfer {
    Move,
    Copy,
}

fn destination_for(source: &Path, dest_dir: &Path) -> Result<PathBuf, String> {
    let name = source
        .file_name()
        .ok_or_else(|| format!("Invalid source path: {}", source.display()))?;
    if dest_dir.starts_with(source) {
        return Err("Cannot place a folder inside itself".to_string());
    }
    Ok(dest_dir.join(name))
}

async fn transfer_entries<F: FileSystem>(
    fs: &F,
    sources: &[PathBuf],
    dest_dir: &Path,
    transfer: Transfer,
) -> BatchReport {
    let mut report = BatchReport::default();

    for source in sources {
        let destination = match destination_for(source, dest_dir) {
            Ok(destination) => destination,
            Err(e) => {
                report.fail(source, e);
                continue;
            }
        };

        if fs.exists(&destination).await {
            report.fail(source, FsError::destination_exists(&destination).message);
            continue;
        }

        let result = match transfer {
            Transfer::Move => fs.move_entry(source, &destination).await,
            Transfer::Copy => fs.copy_entry(source, &destination).await,
        };

        match result {
            Ok(()) => report.succeeded.push(destination),
            Err(e) => report.fail(source, e.message),
        }
    }

    tracing::info!(
        target: "files",
        operation = ?transfer,
        dest = %dest_dir.display(),
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch transfer finished"
    );

    report
}

/// Moves each source into `dest_dir`, keeping its name.
pub async fn move_entries<F: FileSystem>(fs: &F, sources: &[PathBuf], dest_dir: &Path) -> BatchReport {
    transfer_entries(fs, sources, dest_dir, Transfer::Move).await
}

/// Copies each source (recursively for folders) into `dest_dir`.
pub async fn copy_entries<F: FileSystem>(fs: &F, sources: &[PathBuf], dest_dir: &Path) -> BatchReport {
    transfer_entries(fs, sources, dest_dir, Transfer::Copy).await
}

pub async fn delete_entries<F: FileSystem>(fs: &F, paths: &[PathBuf], mode: DeleteMode) -> BatchReport {
    let mut report = BatchReport::default();

    for path in paths {
        match fs.delete_entry(path, mode).await {
            Ok(()) => report.succeeded.push(path.clone()),
            Err(e) => report.fail(path, e.message),
        }
    }

    tracing::info!(
        target: "files",
        mode = ?mode,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch delete finished"
    );

    report
}

/// Renames an entry in place. The new name must be a bare file name.
pub async fn rename_entry<F: FileSystem>(fs: &F, path: &Path, new_name: &str) -> Result<PathBuf, FsError> {
    let new_name = new_name.trim();
    if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
        return Err(FsError::new(
            FsErrorKind::Other,
            format!("Invalid file name: {:?}", new_name),
        ));
    }

    let target = path.with_file_name(new_name);
    if target.as_path() == path {
        return Ok(target);
    }
    fs.rename_entry(path, &target).await?;
    Ok(target)
}
