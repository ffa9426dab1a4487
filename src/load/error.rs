//! Error types for loading files into tables.

use thiserror::Error;

use crate::database::DatabaseError;
use crate::staging::StagingError;
use crate::validation::ValidationError;

/// Why a file's rows could not be turned into a table definition.
#[derive(Debug, Error)]
pub enum SchemaProblem {
    /// A sanitized name is still not a usable identifier.
    #[error(transparent)]
    Identifier(#[from] ValidationError),

    /// The delimited text is malformed (including rows of the wrong width).
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The file has no header row.
    #[error("no header row")]
    MissingHeader,
}

/// Errors that can occur while loading a batch or a single file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Source listing or staging directory failure.
    #[error("staging failed: {0}")]
    Directory(#[from] StagingError),

    /// Content is neither UTF-8 nor ISO-8859-1.
    #[error("cannot decode {file}: not valid UTF-8 or ISO-8859-1")]
    Decode { file: String },

    /// Rows or names do not form a valid table.
    #[error("invalid table in {file}: {problem}")]
    Schema {
        file: String,
        #[source]
        problem: SchemaProblem,
    },

    /// Two distinct inputs sanitize to the same identifier.
    #[error("'{first}' and '{second}' both map to '{name}'")]
    Collision {
        name: String,
        first: String,
        second: String,
    },

    /// Connection, statement, bulk copy or commit failure.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl LoadError {
    pub(crate) fn schema(file: &str, problem: impl Into<SchemaProblem>) -> Self {
        LoadError::Schema {
            file: file.to_string(),
            problem: problem.into(),
        }
    }
}
