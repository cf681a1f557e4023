#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tagshelf_lib::files::fs::{DeleteMode, FileSystem, FsError, FsErrorKind};
use tagshelf_lib::tags::types::FileItem;

/// In-memory filesystem that logs every call, for asserting on call order.
#[derive(Default)]
pub struct RecordingFs {
    entries: Mutex<BTreeSet<PathBuf>>,
    calls: Mutex<Vec<String>>,
    cross_device: bool,
    fail_copy: bool,
}

impl RecordingFs {
    pub fn with_files(paths: &[&str]) -> Self {
        Self {
            entries: Mutex::new(paths.iter().map(PathBuf::from).collect()),
            ..Self::default()
        }
    }

    /// Every rename fails with a cross-device error.
    pub fn cross_device(mut self) -> Self {
        self.cross_device = true;
        self
    }

    pub fn failing_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn has(&self, path: &str) -> bool {
        self.entries.lock().unwrap().contains(Path::new(path))
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn item(path: &Path) -> FileItem {
        FileItem {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            is_directory: false,
            size: 0,
            modified: None,
        }
    }
}

impl FileSystem for RecordingFs {
    async fn list_directory(&self, path: &Path) -> Result<Vec<FileItem>, FsError> {
        self.log(format!("list:{}", path.display()));
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|entry| entry.parent() == Some(path))
            .map(|entry| Self::item(entry))
            .collect())
    }

    async fn list_directory_recursive(&self, path: &Path) -> Result<Vec<FileItem>, FsError> {
        self.log(format!("list_recursive:{}", path.display()));
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|entry| entry.starts_with(path) && entry.as_path() != path)
            .map(|entry| Self::item(entry))
            .collect())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.log(format!("exists:{}", path.display()));
        self.entries.lock().unwrap().contains(path)
    }

    async fn rename_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.log(format!("rename:{}->{}", from.display(), to.display()));
        if self.cross_device {
            return Err(FsError::new(FsErrorKind::CrossDevice, "cross-device link"));
        }
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains(from) {
            return Err(FsError::new(FsErrorKind::SourceMissing, "missing"));
        }
        if entries.contains(to) {
            return Err(FsError::destination_exists(to));
        }
        entries.remove(from);
        entries.insert(to.to_path_buf());
        Ok(())
    }

    async fn copy_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.log(format!("copy:{}->{}", from.display(), to.display()));
        if self.fail_copy {
            return Err(FsError::new(FsErrorKind::Other, "disk full"));
        }
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains(from) {
            return Err(FsError::new(FsErrorKind::SourceMissing, "missing"));
        }
        entries.insert(to.to_path_buf());
        Ok(())
    }

    async fn delete_entry(&self, path: &Path, _mode: DeleteMode) -> Result<(), FsError> {
        self.log(format!("delete:{}", path.display()));
        if self.entries.lock().unwrap().remove(path) {
            Ok(())
        } else {
            Err(FsError::new(FsErrorKind::SourceMissing, "missing"))
        }
    }
}
