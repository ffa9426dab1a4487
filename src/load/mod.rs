//! Loading delimited text files into database tables
//!
//! [`LoadPlan`] turns one file into a table definition and a bulk-copy
//! payload; [`LoadEngine`] runs a whole directory through a database, one
//! session per file.

pub mod engine;
pub mod error;
pub mod plan;

pub use engine::{BatchConfig, BatchReport, FileReport, LoadEngine, LoadOutcome};
pub use error::{LoadError, SchemaProblem};
pub use plan::{LoadPlan, decode_content, parse_table, plan_directory};
