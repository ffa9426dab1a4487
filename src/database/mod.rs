//! Database backend abstraction for bulk table replacement
//!
//! This module provides a database abstraction layer that supports:
//! - PostgreSQL: the production target, loaded with `COPY ... FROM STDIN`
//! - DuckDB: embedded database, file-based or in-memory
//!
//! Every backend performs the same replace protocol for a table: drop it if
//! present, create it from a [`TableSchema`], bulk-copy the staged rows,
//! grant read access to everyone, and commit. The statements come from
//! [`schema`], so the backends differ only in how the rows are transferred.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod schema;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::{DuckDBBackend, DuckDBConnector};

#[cfg(feature = "postgres-backend")]
pub use self::postgres::{PostgresBackend, PostgresConnector};

pub use config::{ConnectionConfig, DatabaseBackendType, LoaderConfig};
pub use schema::{ColumnSpec, TableSchema};

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Bulk copy failed
    #[error("Copy failed: {0}")]
    CopyFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Query result row as a JSON value
pub type QueryRow = serde_json::Value;

/// Query result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Rows of data
    pub rows: Vec<QueryRow>,
    /// Number of rows affected (for INSERT/UPDATE/DELETE)
    pub rows_affected: Option<u64>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: None,
            execution_time_ms: 0,
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Database backend trait for table replacement and ad-hoc queries
///
/// One value of this trait is one database session. Sessions are opened per
/// file by a [`SessionFactory`] and never shared between loads.
#[async_trait(?Send)]
pub trait DatabaseBackend {
    /// Replace a table with the rows of a staged payload
    ///
    /// Runs drop, create, bulk copy and grant inside one transaction and
    /// commits. On error nothing is committed.
    ///
    /// # Arguments
    /// * `schema` - Validated target table and columns
    /// * `payload_path` - Staged CSV file with a header line
    ///
    /// # Returns
    /// Number of rows copied
    async fn replace_table(&self, schema: &TableSchema, payload_path: &Path)
    -> DatabaseResult<u64>;

    /// Execute a SQL query and return results
    ///
    /// # Arguments
    /// * `sql` - SQL query to execute
    ///
    /// # Returns
    /// Query result with columns and rows
    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult>;

    /// Check if database is healthy and accessible
    ///
    /// The batch driver calls this on every fresh session before touching
    /// any table.
    ///
    /// # Returns
    /// True if healthy
    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Get the database backend type name
    ///
    /// # Returns
    /// Backend type string ("duckdb" or "postgres")
    fn backend_type(&self) -> &'static str;

    /// Close the database connection
    ///
    /// # Returns
    /// Unit on success
    async fn close(&self) -> DatabaseResult<()>;
}

/// Opens fresh database sessions
#[async_trait(?Send)]
pub trait SessionFactory {
    /// Session type produced by this factory
    type Session: DatabaseBackend;

    /// Open a new session
    async fn open_session(&self) -> DatabaseResult<Self::Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn test_query_result_rows() {
        let result = QueryResult::new(
            vec!["height".to_string()],
            vec![serde_json::json!({"height": 1.801})],
        );
        assert!(!result.is_empty());
        assert_eq!(result.row_count(), 1);
        assert!(result.rows_affected.is_none());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DatabaseError::CopyFailed("broken pipe".into()).to_string(),
            "Copy failed: broken pipe"
        );
        assert_eq!(
            DatabaseError::ConnectionFailed("refused".into()).to_string(),
            "Connection failed: refused"
        );
    }
}
