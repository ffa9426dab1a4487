//! Source file discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{StagingError, StagingResult};
use crate::load::LoadError;
use crate::validation::input::{SOURCE_EXTENSION, table_name_for_file};

/// A delimited text file selected for loading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// File name including the extension
    pub name: String,
    /// Full path in the source directory
    pub path: PathBuf,
    /// Sanitized name of the table the file is loaded into
    pub table_name: String,
}

impl SourceFile {
    /// Describe a source file from its path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let table_name = table_name_for_file(&name);
        Self {
            name,
            path,
            table_name,
        }
    }
}

/// Lists all CSV files in a directory.
///
/// Only regular files are returned; the extension match is case-insensitive.
/// Files are sorted by file name.
pub fn list_sources(dir: &Path) -> StagingResult<Vec<SourceFile>> {
    if !dir.is_dir() {
        return Err(StagingError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| StagingError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| StagingError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION));

        if is_csv {
            files.push(SourceFile::from_path(path));
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(files)
}

/// Fail when two sources would be loaded into the same table.
pub fn check_table_collisions(sources: &[SourceFile]) -> Result<(), LoadError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();

    for source in sources {
        if let Some(first) = seen.insert(&source.table_name, &source.name) {
            return Err(LoadError::Collision {
                name: source.table_name.clone(),
                first: first.to_string(),
                second: source.name.clone(),
            });
        }
    }

    Ok(())
}
