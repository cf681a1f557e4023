use thiserror::Error;

/// Common storage-related errors used across the tag library and settings.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse data: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),

    #[error("Storage lock poisoned: {0}")]
    LockError(String),
}

impl StorageError {
    pub fn directory(msg: impl Into<String>) -> Self {
        StorageError::DirectoryError(msg.into())
    }

    pub fn lock(msg: impl Into<String>) -> Self {
        StorageError::LockError(msg.into())
    }
}
