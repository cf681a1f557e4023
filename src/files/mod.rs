pub mod fs;
pub mod ops;

pub use fs::{DeleteMode, FileSystem, FsError, FsErrorKind, LocalFileSystem};
pub use ops::{BatchReport, FailedEntry};
