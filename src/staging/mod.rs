//! Source discovery and the staging directory
//!
//! [`list_sources`] selects the CSV files of a source directory and
//! [`StagingArea`] holds the batch's working copies until the batch ends.

pub mod area;
pub mod discovery;
pub mod error;

pub use area::{StagingArea, validate_dir_name};
pub use discovery::{SourceFile, check_table_collisions, list_sources};
pub use error::{StagingError, StagingResult};
