//! dir-to-db - bulk-load a directory of CSV files into database tables
//!
//! Provides:
//! - Source discovery and a scoped staging directory
//! - Identifier sanitization for table and column names
//! - Column type inference over every value of a file
//! - Table replacement on PostgreSQL and DuckDB backends
//! - A batch engine that loads each file in its own transaction
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "duckdb-backend")]
//! # async fn run() -> Result<(), dir_to_db::LoadError> {
//! use dir_to_db::{BatchConfig, LoadEngine};
//! use dir_to_db::database::DuckDBConnector;
//!
//! let engine = LoadEngine::new(DuckDBConnector::new("warehouse.duckdb"));
//! let report = engine.run_batch(BatchConfig::new("incoming", "/tmp")).await?;
//! for file in &report.files {
//!     println!("{}", file);
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod database;
pub mod inference;
pub mod load;
pub mod staging;
pub mod validation;

// Re-export commonly used types
pub use database::{
    ConnectionConfig, DatabaseBackend, DatabaseBackendType, DatabaseError, DatabaseResult,
    LoaderConfig, SessionFactory, TableSchema,
};
pub use inference::InferredType;
pub use load::{BatchConfig, BatchReport, FileReport, LoadEngine, LoadError, LoadOutcome, LoadPlan};
pub use staging::{SourceFile, StagingArea, StagingError};
pub use validation::{ValidationError, sanitize_identifier};
