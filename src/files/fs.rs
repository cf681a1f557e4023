//! Filesystem collaborator used by scanning, tag mutation and file operations.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tags::types::FileItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsErrorKind {
    SourceMissing,
    DestinationExists,
    PermissionDenied,
    CrossDevice,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FsError {
    pub kind: FsErrorKind,
    pub message: String,
}

impl FsError {
    pub fn new(kind: FsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn destination_exists(path: &Path) -> Self {
        Self::new(
            FsErrorKind::DestinationExists,
            format!("Destination already exists: {}", path.display()),
        )
    }
}

#[cfg(unix)]
const CROSS_DEVICE_CODE: i32 = 18; // EXDEV
#[cfg(windows)]
const CROSS_DEVICE_CODE: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(any(unix, windows)))]
const CROSS_DEVICE_CODE: i32 = -1;

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        let kind = if err.raw_os_error() == Some(CROSS_DEVICE_CODE) {
            FsErrorKind::CrossDevice
        } else {
            match err.kind() {
                io::ErrorKind::NotFound => FsErrorKind::SourceMissing,
                io::ErrorKind::AlreadyExists => FsErrorKind::DestinationExists,
                io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
                _ => FsErrorKind::Other,
            }
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    #[default]
    Trash,
    Permanent,
}

/// Asynchronous filesystem operations the tag engine depends on.
///
/// `rename_entry` must never overwrite an existing destination.
pub trait FileSystem: Send + Sync {
    fn list_directory(&self, path: &Path) -> impl Future<Output = Result<Vec<FileItem>, FsError>> + Send;

    /// Every descendant of `path`, directories included.
    fn list_directory_recursive(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<FileItem>, FsError>> + Send;

    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    /// Whether both paths name one entry on disk. Two distinct files whose
    /// names differ only in case are not the same entry.
    fn same_entry(&self, a: &Path, b: &Path) -> impl Future<Output = bool> + Send {
        async move { a == b }
    }

    fn rename_entry(&self, from: &Path, to: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Copies a file or a whole directory tree.
    fn copy_entry(&self, from: &Path, to: &Path) -> impl Future<Output = Result<(), FsError>> + Send;

    fn delete_entry(&self, path: &Path, mode: DeleteMode) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Native move, falling back to copy-then-delete across devices. The
    /// source is only removed once the copy has succeeded.
    fn move_entry(&self, from: &Path, to: &Path) -> impl Future<Output = Result<(), FsError>> + Send {
        async move {
            match self.rename_entry(from, to).await {
                Err(err) if err.kind == FsErrorKind::CrossDevice => {
                    tracing::info!(
                        target: "files",
                        from = %from.display(),
                        to = %to.display(),
                        "Cross-device move, falling back to copy"
                    );
                    self.copy_entry(from, to).await?;
                    self.delete_entry(from, DeleteMode::Permanent).await
                }
                other => other,
            }
        }
    }
}

/// Local disk implementation on top of `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

async fn file_item(path: PathBuf) -> io::Result<FileItem> {
    let metadata = tokio::fs::symlink_metadata(&path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

    Ok(FileItem {
        name,
        path,
        is_directory: metadata.is_dir(),
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        modified,
    })
}

async fn read_dir_items(path: &Path) -> io::Result<Vec<FileItem>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut items = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        match file_item(entry.path()).await {
            Ok(item) => items.push(item),
            // entry vanished between listing and stat
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(items)
}

#[cfg(unix)]
async fn same_identity(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (tokio::fs::metadata(a).await, tokio::fs::metadata(b).await) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
async fn same_identity(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_recursive<'a>(
    from: &'a Path,
    to: &'a Path,
) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let metadata = tokio::fs::metadata(from).await?;
        if !metadata.is_dir() {
            tokio::fs::copy(from, to).await?;
            return Ok(());
        }

        tokio::fs::create_dir(to).await?;
        let mut entries = tokio::fs::read_dir(from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let source = entry.path();
            let target = to.join(entry.file_name());
            copy_recursive(&source, &target).await?;
        }
        Ok(())
    })
}

impl FileSystem for LocalFileSystem {
    async fn list_directory(&self, path: &Path) -> Result<Vec<FileItem>, FsError> {
        Ok(read_dir_items(path).await?)
    }

    async fn list_directory_recursive(&self, path: &Path) -> Result<Vec<FileItem>, FsError> {
        let mut items = Vec::new();
        let mut pending = vec![path.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let children = match read_dir_items(&dir).await {
                Ok(children) => children,
                // the root must be readable; unreadable subfolders are skipped
                Err(e) if dir.as_path() != path => {
                    tracing::warn!(
                        target: "files",
                        path = %dir.display(),
                        error = %e,
                        "Skipping unreadable directory"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            for child in children {
                if child.is_directory {
                    pending.push(child.path.clone());
                }
                items.push(child);
            }
        }

        Ok(items)
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn same_entry(&self, a: &Path, b: &Path) -> bool {
        a == b || same_identity(a, b).await
    }

    async fn rename_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if !tokio::fs::try_exists(from).await.unwrap_or(false) {
            return Err(FsError::new(
                FsErrorKind::SourceMissing,
                format!("Source does not exist: {}", from.display()),
            ));
        }
        // on case-insensitive volumes a case-only rename sees its own source here
        if tokio::fs::try_exists(to).await.unwrap_or(false) && !self.same_entry(from, to).await {
            return Err(FsError::destination_exists(to));
        }
        tokio::fs::rename(from, to).await?;
        Ok(())
    }

    async fn copy_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        if tokio::fs::try_exists(to).await.unwrap_or(false) {
            return Err(FsError::destination_exists(to));
        }
        copy_recursive(from, to).await?;
        Ok(())
    }

    async fn delete_entry(&self, path: &Path, mode: DeleteMode) -> Result<(), FsError> {
        match mode {
            DeleteMode::Trash => {
                let target = path.to_path_buf();
                tokio::task::spawn_blocking(move || trash::delete(&target))
                    .await
                    .map_err(|e| FsError::new(FsErrorKind::Other, e.to_string()))?
                    .map_err(|e| FsError::new(FsErrorKind::Other, e.to_string()))
            }
            DeleteMode::Permanent => {
                let metadata = tokio::fs::symlink_metadata(path).await?;
                if metadata.is_dir() {
                    tokio::fs::remove_dir_all(path).await?;
                } else {
                    tokio::fs::remove_file(path).await?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let missing: FsError = io::Error::from(io::ErrorKind::NotFound).into();
        assert_eq!(missing.kind, FsErrorKind::SourceMissing);

        let denied: FsError = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert_eq!(denied.kind, FsErrorKind::PermissionDenied);

        let exists: FsError = io::Error::from(io::ErrorKind::AlreadyExists).into();
        assert_eq!(exists.kind, FsErrorKind::DestinationExists);

        let cross: FsError = io::Error::from_raw_os_error(CROSS_DEVICE_CODE).into();
        assert_eq!(cross.kind, FsErrorKind::CrossDevice);
    }

    #[tokio::test]
    async fn test_list_directory_is_shallow() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"abc").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub").join("b.txt"), b"").unwrap();

        let fs = LocalFileSystem::new();
        let mut items = fs.list_directory(tmp.path()).await.unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "a.txt");
        assert_eq!(items[0].size, 3);
        assert!(items[1].is_directory);
    }

    #[tokio::test]
    async fn test_list_directory_recursive_includes_descendants() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub").join("deep")).unwrap();
        std::fs::write(tmp.path().join("sub").join("deep").join("c.txt"), b"").unwrap();

        let fs = LocalFileSystem::new();
        let items = fs.list_directory_recursive(tmp.path()).await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"sub"));
        assert!(names.contains(&"deep"));
        assert!(names.contains(&"c.txt"));
    }

    #[tokio::test]
    async fn test_rename_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        let err = LocalFileSystem.rename_entry(&a, &b).await.unwrap_err();
        assert_eq!(err.kind, FsErrorKind::DestinationExists);
        assert_eq!(std::fs::read(&b).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_same_entry_compares_files_not_names() {
        let tmp = tempfile::tempdir().unwrap();
        let upper = tmp.path().join("Note.txt");
        let lower = tmp.path().join("note.txt");
        let link = tmp.path().join("link.txt");
        std::fs::write(&upper, b"upper").unwrap();
        std::fs::hard_link(&upper, &link).unwrap();

        let fs = LocalFileSystem::new();
        assert!(fs.same_entry(&upper, &upper).await);
        assert!(fs.same_entry(&upper, &link).await);
        assert!(!fs.same_entry(&upper, &tmp.path().join("missing.txt")).await);

        std::fs::write(&lower, b"lower").unwrap();
        if std::fs::read_dir(tmp.path()).unwrap().count() == 3 {
            // case-sensitive volume: two files
            assert!(!fs.same_entry(&upper, &lower).await);
        }
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalFileSystem
            .rename_entry(&tmp.path().join("nope"), &tmp.path().join("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FsErrorKind::SourceMissing);
    }

    #[tokio::test]
    async fn test_copy_directory_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("inner")).unwrap();
        std::fs::write(src.join("inner").join("f.txt"), b"data").unwrap();

        let dst = tmp.path().join("dst");
        LocalFileSystem.copy_entry(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(dst.join("inner").join("f.txt")).unwrap(), b"data");
        assert!(src.join("inner").join("f.txt").exists());
    }

    #[tokio::test]
    async fn test_permanent_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("x"), b"").unwrap();

        LocalFileSystem
            .delete_entry(&dir, DeleteMode::Permanent)
            .await
            .unwrap();
        assert!(!dir.exists());
    }
}
