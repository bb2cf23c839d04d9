use thiserror::Error;

use crate::{disk::DiskFault, error::ErrorCode, fs::config::NAME_LEN};

/// File system errors
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Underlying device misuse; the kernel halts on these
    #[error(transparent)]
    Device(#[from] DiskFault),

    #[error("file name must be 1 to {} bytes: {0:?}", NAME_LEN)]
    InvalidName(String),

    #[error("file name already exists at block {block}: {name}")]
    AlreadyExists { name: String, block: usize },

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("disk space is full")]
    DiskFull,

    #[error("{0}-byte blocks cannot hold a {}-byte file name", NAME_LEN)]
    BlockTooSmall(usize),
}

impl FileSystemError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DiskFull | Self::BlockTooSmall(_) => ErrorCode::OutOfRange,
            Self::InvalidName(_)
            | Self::AlreadyExists { .. }
            | Self::NotFound(_)
            | Self::Device(_) => ErrorCode::BadArgument,
        }
    }
}

/// File system result type
pub type Result<T> = std::result::Result<T, FileSystemError>;
