//! Validation functionality
//!
//! Provides identifier sanitization and validation for every table and
//! column name that is interpolated into SQL.

pub mod input;

pub use input::{
    ValidationError, ValidationResult, is_sql_reserved_word, sanitize_identifier,
    table_name_for_file, validate_identifier,
};
