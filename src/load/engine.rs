//! Batch driver
//!
//! Loads every source of a directory, one file at a time, each through its
//! own database session. A failed file is recorded and the batch moves on;
//! only failures to list or stage the sources abort the batch.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

use super::error::LoadError;
use super::plan::LoadPlan;
use crate::database::config::DEFAULT_STAGING_DIR_NAME;
use crate::database::{DatabaseBackend, DatabaseError, SessionFactory};
use crate::staging::{SourceFile, StagingArea, check_table_collisions, list_sources};

/// Where a batch reads from and stages to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Directory holding the `*.csv` sources
    pub source_dir: PathBuf,
    /// Directory the staging subdirectory is created in
    pub staging_root: PathBuf,
    /// Name of the staging subdirectory
    pub staging_dir_name: String,
}

impl BatchConfig {
    /// Create a batch configuration with the default staging subdirectory
    pub fn new(source_dir: impl Into<PathBuf>, staging_root: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            staging_root: staging_root.into(),
            staging_dir_name: DEFAULT_STAGING_DIR_NAME.to_string(),
        }
    }

    /// Use a different staging subdirectory name
    pub fn with_staging_dir_name(mut self, name: impl Into<String>) -> Self {
        self.staging_dir_name = name.into();
        self
    }

    /// Full path of the staging subdirectory
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_root.join(&self.staging_dir_name)
    }
}

/// Result of loading one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadOutcome {
    /// Table replaced and committed
    Succeeded { rows: u64 },
    /// Nothing committed for this file
    Failed { reason: String },
}

impl LoadOutcome {
    /// Whether the file was loaded
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Succeeded { .. })
    }
}

/// Outcome of one file of a batch
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Source file name
    pub file: String,
    /// Target table name
    pub table: String,
    /// What happened
    pub outcome: LoadOutcome,
}

impl std::fmt::Display for FileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            LoadOutcome::Succeeded { rows } => {
                write!(f, "{} -> {}: loaded {} rows", self.file, self.table, rows)
            }
            LoadOutcome::Failed { reason } => {
                write!(f, "{} -> {}: FAILED ({})", self.file, self.table, reason)
            }
        }
    }
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Per-file outcomes, in processing order
    pub files: Vec<FileReport>,
    /// Wall-clock time of the batch
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl BatchReport {
    /// Whether every file was loaded
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|f| f.outcome.is_success())
    }

    /// Number of files loaded
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_success()).count()
    }

    /// Number of files that failed
    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    /// Outcome for a given source file name
    pub fn outcome_for(&self, file: &str) -> Option<&LoadOutcome> {
        self.files
            .iter()
            .find(|f| f.file == file)
            .map(|f| &f.outcome)
    }
}

/// Loads files into tables through sessions from a [`SessionFactory`]
pub struct LoadEngine<F> {
    sessions: F,
}

impl<F: SessionFactory> LoadEngine<F> {
    /// Create an engine over a session factory
    pub fn new(sessions: F) -> Self {
        Self { sessions }
    }

    /// Load every source of `config.source_dir`.
    ///
    /// Returns `Err` only when the batch cannot start: the source directory
    /// cannot be listed, two sources map to the same table, or the staging
    /// directory cannot be prepared. The staging directory is removed before
    /// returning in every case.
    pub async fn run_batch(&self, config: BatchConfig) -> Result<BatchReport, LoadError> {
        let start = Instant::now();

        let sources = list_sources(&config.source_dir)?;
        info!(
            "Found {} file(s) in {}",
            sources.len(),
            config.source_dir.display()
        );
        check_table_collisions(&sources)?;

        let staging =
            StagingArea::acquire_named(&config.staging_root, &config.staging_dir_name, &sources)?;

        let mut files = Vec::with_capacity(sources.len());
        for source in &sources {
            let outcome = match self.load_file(&staging, source).await {
                Ok(rows) => {
                    info!("Loaded {} into {} ({} rows)", source.name, source.table_name, rows);
                    LoadOutcome::Succeeded { rows }
                }
                Err(e) => {
                    warn!("Failed to load {}: {}", source.name, e);
                    LoadOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            files.push(FileReport {
                file: source.name.clone(),
                table: source.table_name.clone(),
                outcome,
            });
        }

        if let Err(e) = staging.release() {
            error!("{}", e);
        }

        let report = BatchReport {
            files,
            duration: start.elapsed(),
        };
        info!(
            "Batch finished in {:?}: {} loaded, {} failed",
            report.duration,
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Load one staged source into its table.
    ///
    /// Decodes and plans the staged copy, writes the bulk-copy payload next to
    /// it, and replaces the table through a fresh session. A session that
    /// fails its health check is closed without touching the table.
    pub async fn load_file(
        &self,
        staging: &StagingArea,
        source: &SourceFile,
    ) -> Result<u64, LoadError> {
        let content = staging.read_staged(source)?;
        let plan = LoadPlan::build(source, &content)?;
        let payload_path = staging.write_payload(plan.schema.table(), plan.payload())?;

        let session = self.sessions.open_session().await?;
        let result = match session.health_check().await {
            Ok(true) => session.replace_table(&plan.schema, &payload_path).await,
            Ok(false) => Err(DatabaseError::ConnectionFailed(format!(
                "{} session failed its health check",
                session.backend_type()
            ))),
            Err(e) => Err(e),
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close {} session: {}", session.backend_type(), e);
        }

        Ok(result?)
    }
}
