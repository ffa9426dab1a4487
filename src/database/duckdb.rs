//! DuckDB database backend implementation
//!
//! Provides an embedded database backend using DuckDB. Rows are loaded with
//! DuckDB's own `COPY ... FROM '<file>'` reading the staged payload directly.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::schema::{TableSchema, duckdb_type_for};
use super::{DatabaseBackend, DatabaseError, DatabaseResult, QueryResult, SessionFactory};

/// DuckDB database backend
///
/// Supports both file-based persistence and in-memory mode.
pub struct DuckDBBackend {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDBBackend {
    /// Create a new DuckDB backend with a file-based database
    ///
    /// # Arguments
    /// * `db_path` - Path to the DuckDB database file
    ///
    /// # Returns
    /// A new DuckDB backend instance
    pub fn new(db_path: impl AsRef<Path>) -> DatabaseResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            DatabaseError::ConnectionFailed(format!(
                "Failed to open DuckDB {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory DuckDB backend
    ///
    /// Tables disappear when the backend is dropped.
    pub fn in_memory() -> DatabaseResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Check if this is an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    /// Convert a DuckDB row to a JSON value
    fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value: serde_json::Value = match row.get_ref(i) {
                Ok(value_ref) => Self::value_ref_to_json(value_ref),
                Err(_) => serde_json::Value::Null,
            };
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    /// Convert a DuckDB ValueRef to a JSON value
    fn value_ref_to_json(value: duckdb::types::ValueRef) -> serde_json::Value {
        use duckdb::types::ValueRef;

        match value {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Boolean(b) => serde_json::Value::Bool(b),
            ValueRef::TinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::SmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Int(i) => serde_json::Value::Number(i.into()),
            ValueRef::BigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::HugeInt(i) => {
                // i128 may not fit in a JSON number
                serde_json::Value::String(i.to_string())
            }
            ValueRef::UTinyInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::USmallInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::UBigInt(i) => serde_json::Value::Number(i.into()),
            ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Double(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                String::from_utf8_lossy(bytes).into_owned().into()
            }
            ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
            other => serde_json::Value::String(format!("{:?}", other)),
        }
    }

    /// Column names of the current result set
    fn column_names(rows: &duckdb::Rows) -> Vec<String> {
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect()
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for DuckDBBackend {
    async fn replace_table(
        &self,
        schema: &TableSchema,
        payload_path: &Path,
    ) -> DatabaseResult<u64> {
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;

        let tx = conn.transaction().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        let create_sql = schema.create_table_sql_with(duckdb_type_for);
        for sql in [schema.drop_table_sql(), create_sql] {
            debug!("{}", sql);
            tx.execute_batch(&sql)
                .map_err(|e| DatabaseError::QueryFailed(format!("{}: {}", sql, e)))?;
        }

        let copy_sql = schema.copy_from_file_sql(payload_path);
        debug!("{}", copy_sql);
        tx.execute_batch(&copy_sql)
            .map_err(|e| DatabaseError::CopyFailed(format!("{}: {}", schema.table(), e)))?;

        let rows: i64 = tx
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", schema.table()),
                [],
                |row| row.get(0),
            )
            .map_err(|e| DatabaseError::QueryFailed(format!("Row count failed: {}", e)))?;

        // DuckDB has no roles, so there is nothing to grant
        debug!("Skipping {} on DuckDB", schema.grant_select_sql());

        tx.commit().map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit {}: {}", schema.table(), e))
        })?;

        info!("Replaced table {} ({} rows)", schema.table(), rows);
        Ok(rows.max(0) as u64)
    }

    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();

        let conn = self
            .connection
            .lock()
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Lock error: {}", e)))?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DatabaseError::QueryFailed(format!("Prepare failed: {}", e)))?;

        // Columns are only known once the statement has run
        let mut result_rows = stmt
            .query([])
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let columns = Self::column_names(&result_rows);

        let mut rows = Vec::new();
        while let Some(row) = result_rows
            .next()
            .map_err(|e| DatabaseError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            rows.push(Self::row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            rows_affected: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 as healthy").await?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }

    async fn close(&self) -> DatabaseResult<()> {
        // DuckDB connection is closed when dropped
        Ok(())
    }
}

/// Opens one DuckDB session per load against a database file
#[derive(Debug, Clone)]
pub struct DuckDBConnector {
    db_path: PathBuf,
}

impl DuckDBConnector {
    /// Create a connector for the given database file
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Database file sessions are opened against
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[async_trait(?Send)]
impl SessionFactory for DuckDBConnector {
    type Session = DuckDBBackend;

    async fn open_session(&self) -> DatabaseResult<DuckDBBackend> {
        DuckDBBackend::new(&self.db_path)
    }
}
