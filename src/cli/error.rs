//! CLI-specific error types

use crate::database::DatabaseError;
use crate::load::LoadError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] DatabaseError),

    #[error("Load error: {0}")]
    LoadError(#[from] LoadError),

    #[error("{failed} of {total} file(s) failed to load")]
    LoadFailed { failed: usize, total: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}
