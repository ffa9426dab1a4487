//! Table schema generation
//!
//! Turns sanitized column names and inferred types into the column-definition
//! string and the statements of the load protocol. Both backends render their
//! SQL from here so the DDL has a single source.
//!
//! Names are interpolated without quoting. [`TableSchema::new`] re-validates
//! every identifier so an unsanitized name can never reach a statement.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::inference::InferredType;
use crate::validation::input::{ValidationResult, validate_identifier};

/// Options shared by every bulk-copy statement: CSV, header line skipped, comma-delimited
const COPY_OPTIONS: &str = "FORMAT csv, HEADER true, DELIMITER ','";

/// Map an inferred type to the declared column type
pub fn sql_type_for(ty: InferredType) -> &'static str {
    match ty {
        InferredType::Text => "varchar",
        InferredType::Integer => "int",
        InferredType::Real => "float",
        InferredType::Timestamp => "timestamp",
    }
}

/// Declared column type on DuckDB, where `float` is single precision
pub fn duckdb_type_for(ty: InferredType) -> &'static str {
    match ty {
        InferredType::Real => "double",
        other => sql_type_for(other),
    }
}

/// A sanitized column name and its inferred type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Sanitized column name
    pub name: String,
    /// Type inferred from the column's values
    pub inferred: InferredType,
}

impl ColumnSpec {
    /// Create a new column spec
    pub fn new(name: impl Into<String>, inferred: InferredType) -> Self {
        Self {
            name: name.into(),
            inferred,
        }
    }

    /// Declared SQL type of the column
    pub fn sql_type(&self) -> &'static str {
        sql_type_for(self.inferred)
    }
}

/// Build `"name1 type1, name2 type2, …"` for a `CREATE TABLE` statement.
///
/// Names are used verbatim; they must already have been sanitized.
///
/// # Examples
///
/// ```
/// use dir_to_db::database::schema::{ColumnSpec, build_column_definitions};
/// use dir_to_db::inference::InferredType;
///
/// let columns = vec![
///     ColumnSpec::new("height", InferredType::Real),
///     ColumnSpec::new("label", InferredType::Text),
/// ];
/// assert_eq!(build_column_definitions(&columns), "height float, label varchar");
/// ```
pub fn build_column_definitions(columns: &[ColumnSpec]) -> String {
    column_definitions_with(columns, sql_type_for)
}

fn column_definitions_with(
    columns: &[ColumnSpec],
    type_for: fn(InferredType) -> &'static str,
) -> String {
    columns
        .iter()
        .map(|c| format!("{} {}", c.name, type_for(c.inferred)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Target table name plus its ordered columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Create a schema, validating the table name and every column name
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSpec>) -> ValidationResult<Self> {
        let table = table.into();
        validate_identifier(&table, "table name")?;
        for column in &columns {
            validate_identifier(&column.name, "column name")?;
        }
        Ok(Self { table, columns })
    }

    /// Target table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ordered column specs
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Column-definition string for `CREATE TABLE`
    pub fn column_definitions(&self) -> String {
        build_column_definitions(&self.columns)
    }

    /// `DROP TABLE IF EXISTS <table>`
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }

    /// `CREATE TABLE <table> (<columns>)`
    pub fn create_table_sql(&self) -> String {
        self.create_table_sql_with(sql_type_for)
    }

    /// `CREATE TABLE` declaring each column through `type_for`
    pub fn create_table_sql_with(&self, type_for: fn(InferredType) -> &'static str) -> String {
        format!(
            "CREATE TABLE {} ({})",
            self.table,
            column_definitions_with(&self.columns, type_for)
        )
    }

    /// `GRANT SELECT ON <table> TO PUBLIC`
    pub fn grant_select_sql(&self) -> String {
        format!("GRANT SELECT ON {} TO PUBLIC", self.table)
    }

    /// Bulk-copy statement reading CSV rows from the client connection
    pub fn copy_from_stdin_sql(&self) -> String {
        format!("COPY {} FROM STDIN WITH ({})", self.table, COPY_OPTIONS)
    }

    /// Bulk-copy statement reading CSV rows from a file the server can see
    pub fn copy_from_file_sql(&self, path: &Path) -> String {
        let literal = path.display().to_string().replace('\'', "''");
        format!("COPY {} FROM '{}' ({})", self.table, literal, COPY_OPTIONS)
    }
}
