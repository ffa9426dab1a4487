//! Error types for source discovery and the staging directory.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while listing sources or managing the staging area.
#[derive(Debug, Error)]
pub enum StagingError {
    /// Source directory not found or not a directory.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging directory name is not a single plain path component.
    #[error("invalid staging directory name {name:?}: must be a single directory name")]
    InvalidName { name: String },

    /// Failed to create the staging directory.
    #[error("failed to create staging directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove a leftover entry from the staging directory.
    #[error("failed to clear {path}: {source}")]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy a source file into the staging directory.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file into the staging directory.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a staged file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove the staging directory.
    #[error("failed to remove staging directory {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for staging operations.
pub type StagingResult<T> = std::result::Result<T, StagingError>;
