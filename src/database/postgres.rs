//! PostgreSQL database backend implementation
//!
//! Replaces tables on a PostgreSQL server. Rows are streamed to the server
//! with `COPY ... FROM STDIN` in fixed-size chunks from the staged payload.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::SinkExt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::config::ConnectionConfig;
use super::schema::TableSchema;
use super::{DatabaseBackend, DatabaseError, DatabaseResult, QueryResult, SessionFactory};

/// Size of each chunk sent through the COPY sink
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// PostgreSQL database backend
///
/// One connected session. The connection task is spawned on the current
/// tokio runtime and ends when the client is dropped.
pub struct PostgresBackend {
    /// Connection parameters (password masked when printed)
    connection: ConnectionConfig,
    /// PostgreSQL client (wrapped for async access)
    client: Arc<Mutex<tokio_postgres::Client>>,
}

impl PostgresBackend {
    /// Connect to a PostgreSQL server
    ///
    /// # Arguments
    /// * `connection` - Host, port, database and credentials
    ///
    /// # Returns
    /// A connected backend
    pub async fn connect(connection: &ConnectionConfig) -> DatabaseResult<Self> {
        let (client, conn) = connection
            .to_pg_config()
            .connect(tokio_postgres::NoTls)
            .await
            .map_err(|e| {
                DatabaseError::ConnectionFailed(format!(
                    "Failed to connect to PostgreSQL at {}: {}",
                    connection, e
                ))
            })?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        debug!("Connected to {}", connection);

        Ok(Self {
            connection: connection.clone(),
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Connection parameters of this session
    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Convert a PostgreSQL row to a JSON value
    fn row_to_json(row: &tokio_postgres::Row, columns: &[String]) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        for (i, col_name) in columns.iter().enumerate() {
            let value = Self::get_column_value(row, i);
            map.insert(col_name.clone(), value);
        }

        serde_json::Value::Object(map)
    }

    /// Get a column value as JSON
    fn get_column_value(row: &tokio_postgres::Row, idx: usize) -> serde_json::Value {
        // Try different types
        if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
            return v
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<i32>>(idx) {
            return v
                .map(|n| serde_json::Value::Number(n.into()))
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<bool>>(idx) {
            return v
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
            return v
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
        }
        if let Ok(v) = row.try_get::<_, Option<chrono::NaiveDateTime>>(idx) {
            return v
                .map(|ts| serde_json::Value::String(ts.to_string()))
                .unwrap_or(serde_json::Value::Null);
        }

        serde_json::Value::Null
    }
}

#[async_trait(?Send)]
impl DatabaseBackend for PostgresBackend {
    async fn replace_table(
        &self,
        schema: &TableSchema,
        payload_path: &Path,
    ) -> DatabaseResult<u64> {
        let payload = tokio::fs::read(payload_path).await.map_err(|e| {
            DatabaseError::IoError(format!(
                "Failed to read staged payload {}: {}",
                payload_path.display(),
                e
            ))
        })?;

        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to begin transaction: {}", e))
        })?;

        for sql in [schema.drop_table_sql(), schema.create_table_sql()] {
            debug!("{}", sql);
            tx.batch_execute(&sql)
                .await
                .map_err(|e| DatabaseError::QueryFailed(format!("{}: {}", sql, e)))?;
        }

        let copy_sql = schema.copy_from_stdin_sql();
        debug!("{}", copy_sql);
        let sink = tx
            .copy_in::<str, Bytes>(copy_sql.as_str())
            .await
            .map_err(|e| DatabaseError::CopyFailed(format!("{}: {}", schema.table(), e)))?;
        futures_util::pin_mut!(sink);

        for chunk in payload.chunks(COPY_CHUNK_SIZE) {
            sink.send(Bytes::copy_from_slice(chunk))
                .await
                .map_err(|e| DatabaseError::CopyFailed(format!("{}: {}", schema.table(), e)))?;
        }

        let rows = sink
            .as_mut()
            .finish()
            .await
            .map_err(|e| DatabaseError::CopyFailed(format!("{}: {}", schema.table(), e)))?;

        let grant_sql = schema.grant_select_sql();
        debug!("{}", grant_sql);
        tx.batch_execute(&grant_sql)
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("{}: {}", grant_sql, e)))?;

        tx.commit().await.map_err(|e| {
            DatabaseError::TransactionFailed(format!("Failed to commit {}: {}", schema.table(), e))
        })?;

        info!("Replaced table {} ({} rows)", schema.table(), rows);
        Ok(rows)
    }

    async fn execute_query(&self, sql: &str) -> DatabaseResult<QueryResult> {
        let start = std::time::Instant::now();
        let client = self.client.lock().await;

        let rows = client
            .query(sql, &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Query failed: {}", e)))?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let json_rows: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| Self::row_to_json(row, &columns))
            .collect();

        Ok(QueryResult {
            columns,
            rows: json_rows,
            rows_affected: None,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let result = self.execute_query("SELECT 1 as healthy").await?;
        Ok(!result.rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) -> DatabaseResult<()> {
        // PostgreSQL connection is closed when client is dropped
        Ok(())
    }
}

/// Opens one PostgreSQL session per load
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    connection: ConnectionConfig,
}

impl PostgresConnector {
    /// Create a connector for the given server
    pub fn new(connection: ConnectionConfig) -> Self {
        Self { connection }
    }
}

#[async_trait(?Send)]
impl SessionFactory for PostgresConnector {
    type Session = PostgresBackend;

    async fn open_session(&self) -> DatabaseResult<PostgresBackend> {
        PostgresBackend::connect(&self.connection).await
    }
}
