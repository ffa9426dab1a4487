//! Scoped staging directory
//!
//! A batch copies its sources into `<root>/files_to_process`, reads them from
//! there and writes the per-table bulk-copy payloads next to them. The
//! directory is removed exactly once when the batch ends, either through
//! [`StagingArea::release`] or when the guard is dropped.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::discovery::SourceFile;
use super::error::{StagingError, StagingResult};
use crate::database::config::DEFAULT_STAGING_DIR_NAME;

/// Extension of the bulk-copy payload files
pub const PAYLOAD_EXTENSION: &str = "copy";

/// Check that `name` names exactly one directory directly under the root.
///
/// Empty names, `.`, `..`, absolute paths and nested paths are rejected, since
/// the staging directory is cleared and removed as a whole.
pub fn validate_dir_name(name: &str) -> StagingResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StagingError::InvalidName {
            name: name.to_string(),
        }),
    }
}

/// Guard over the staging subdirectory of one batch
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    released: bool,
}

impl StagingArea {
    /// Prepare `<root>/files_to_process` and copy the sources into it.
    pub fn acquire(root: &Path, sources: &[SourceFile]) -> StagingResult<Self> {
        Self::acquire_named(root, DEFAULT_STAGING_DIR_NAME, sources)
    }

    /// Prepare `<root>/<dir_name>` and copy the sources into it.
    ///
    /// `dir_name` must pass [`validate_dir_name`]. An existing directory is
    /// reused after its contents are deleted. Any other creation failure is
    /// returned. Once the directory exists, the returned guard (or the error
    /// path) removes it again.
    pub fn acquire_named(
        root: &Path,
        dir_name: &str,
        sources: &[SourceFile],
    ) -> StagingResult<Self> {
        validate_dir_name(dir_name)?;
        let dir = root.join(dir_name);

        match std::fs::create_dir(&dir) {
            Ok(()) => debug!("Created staging directory {}", dir.display()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Reusing staging directory {}", dir.display())
            }
            Err(e) => return Err(StagingError::Create { path: dir, source: e }),
        }

        // From here on, dropping `area` on an error path removes the directory
        let area = Self {
            dir,
            released: false,
        };
        area.clear()?;

        for source in sources {
            let target = area.staged_path(source);
            std::fs::copy(&source.path, &target).map_err(|e| StagingError::Copy {
                from: source.path.clone(),
                to: target.clone(),
                source: e,
            })?;
        }

        debug!(
            "Staged {} file(s) in {}",
            sources.len(),
            area.dir.display()
        );
        Ok(area)
    }

    /// Path of the staging directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Where a source file was copied to
    pub fn staged_path(&self, source: &SourceFile) -> PathBuf {
        self.dir.join(&source.name)
    }

    /// Where the bulk-copy payload of a table is written
    pub fn payload_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, PAYLOAD_EXTENSION))
    }

    /// Read the staged copy of a source file
    pub fn read_staged(&self, source: &SourceFile) -> StagingResult<Vec<u8>> {
        let path = self.staged_path(source);
        std::fs::read(&path).map_err(|e| StagingError::Read { path, source: e })
    }

    /// Write the bulk-copy payload of a table, returning its path
    pub fn write_payload(&self, table: &str, payload: &[u8]) -> StagingResult<PathBuf> {
        let path = self.payload_path(table);
        std::fs::write(&path, payload).map_err(|e| StagingError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Remove the staging directory and everything in it
    pub fn release(mut self) -> StagingResult<()> {
        self.released = true;
        remove_dir(&self.dir)
    }

    fn clear(&self) -> StagingResult<()> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StagingError::DirectoryRead {
            path: self.dir.clone(),
            source: e,
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| StagingError::DirectoryRead {
                    path: self.dir.clone(),
                    source: e,
                })?
                .path();

            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|e| StagingError::Clear { path, source: e })?;
        }

        Ok(())
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = remove_dir(&self.dir) {
            warn!("{}", e);
        }
    }
}

fn remove_dir(dir: &Path) -> StagingResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!("Removed staging directory {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StagingError::Remove {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sources_in(dir: &Path, names: &[&str]) -> Vec<SourceFile> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                std::fs::write(&path, format!("header\n{}\n", name)).unwrap();
                SourceFile::from_path(path)
            })
            .collect()
    }

    #[test]
    fn test_acquire_copies_sources() {
        let input = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let sources = sources_in(input.path(), &["csv1.csv", "csv2.csv"]);

        let area = StagingArea::acquire(root.path(), &sources).unwrap();
        assert_eq!(area.path(), root.path().join("files_to_process"));
        for source in &sources {
            assert!(area.staged_path(source).is_file());
            assert_eq!(
                area.read_staged(source).unwrap(),
                std::fs::read(&source.path).unwrap()
            );
        }

        area.release().unwrap();
        assert!(!root.path().join("files_to_process").exists());
        // Sources are untouched
        assert!(sources.iter().all(|s| s.path.is_file()));
    }

    #[test]
    fn test_existing_directory_is_reused_and_cleared() {
        let input = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let leftover_dir = root.path().join("files_to_process");
        std::fs::create_dir_all(leftover_dir.join("old_subdir")).unwrap();
        std::fs::write(leftover_dir.join("stale.csv"), "x").unwrap();

        let sources = sources_in(input.path(), &["fresh.csv"]);
        let area = StagingArea::acquire(root.path(), &sources).unwrap();

        let mut names: Vec<_> = std::fs::read_dir(area.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["fresh.csv"]);
    }

    #[test]
    fn test_sequential_batches_do_not_leak() {
        let input = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        let first = sources_in(input.path(), &["a.csv"]);
        let area = StagingArea::acquire(root.path(), &first).unwrap();
        area.write_payload("a", b"x\n1\n").unwrap();
        area.release().unwrap();

        let second = sources_in(input.path(), &["b.csv"]);
        let area = StagingArea::acquire(root.path(), &second).unwrap();
        assert!(!area.path().join("a.csv").exists());
        assert!(!area.payload_path("a").exists());
        assert!(area.staged_path(&second[0]).exists());
    }

    #[test]
    fn test_drop_releases() {
        let root = TempDir::new().unwrap();
        let dir = {
            let area = StagingArea::acquire(root.path(), &[]).unwrap();
            area.path().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_failed_copy_removes_directory() {
        let root = TempDir::new().unwrap();
        let missing = SourceFile::from_path(root.path().join("missing.csv"));

        let result = StagingArea::acquire(root.path(), &[missing]);
        assert!(matches!(result, Err(StagingError::Copy { .. })));
        assert!(!root.path().join("files_to_process").exists());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let root = TempDir::new().unwrap();
        let result = StagingArea::acquire(&root.path().join("does/not/exist"), &[]);
        assert!(matches!(result, Err(StagingError::Create { .. })));
    }

    #[test]
    fn test_dir_name_must_be_one_component() {
        assert!(validate_dir_name("files_to_process").is_ok());
        assert!(validate_dir_name("stage 2").is_ok());
        for name in ["", ".", "..", "/abs", "a/b", "../escape", "./here"] {
            assert!(
                matches!(validate_dir_name(name), Err(StagingError::InvalidName { .. })),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_invalid_dir_name_leaves_root_untouched() {
        let root = TempDir::new().unwrap();
        let keep = root.path().join("precious.csv");
        std::fs::write(&keep, "a\n1\n").unwrap();

        for name in ["", ".", ".."] {
            let result = StagingArea::acquire_named(root.path(), name, &[]);
            assert!(matches!(result, Err(StagingError::InvalidName { .. })));
        }
        let outside = root.path().join("outside");
        let result = StagingArea::acquire_named(
            &root.path().join("nested"),
            &outside.display().to_string(),
            &[],
        );
        assert!(matches!(result, Err(StagingError::InvalidName { .. })));

        assert!(root.path().is_dir());
        assert_eq!(std::fs::read_to_string(&keep).unwrap(), "a\n1\n");
        assert!(!outside.exists());
    }

    #[test]
    fn test_write_payload() {
        let root = TempDir::new().unwrap();
        let area = StagingArea::acquire_named(root.path(), "custom_stage", &[]).unwrap();

        let path = area.write_payload("csv1", b"height\n1.5\n").unwrap();
        assert_eq!(path, root.path().join("custom_stage").join("csv1.copy"));
        assert_eq!(std::fs::read(&path).unwrap(), b"height\n1.5\n");
    }
}
