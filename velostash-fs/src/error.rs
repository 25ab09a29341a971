use std::io;

use thiserror::Error;
use velostash::StoreError;

/// Errors that can occur during file storage operations.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A file name in the data directory does not decode to a key.
    #[error("malformed file name `{0}`")]
    MalformedName(String),
    /// The write would push the directory past its quota.
    #[error("quota exceeded writing `{key}` ({needed} bytes needed, {remaining} remaining)")]
    QuotaExceeded {
        key: String,
        needed: u64,
        remaining: u64,
    },
}

impl From<FileStoreError> for StoreError {
    fn from(error: FileStoreError) -> Self {
        match error {
            FileStoreError::QuotaExceeded {
                key,
                needed,
                remaining,
            } => Self::QuotaExceeded {
                key,
                needed,
                remaining,
            },
            FileStoreError::Io(err) => Self::Io(err.to_string()),
            FileStoreError::MalformedName(name) => {
                Self::Backend(format!("malformed file name `{name}`"))
            }
        }
    }
}
