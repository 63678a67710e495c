//! Database connection
//!
//! This module owns the SQLite pool used for the whole run and executes
//! generated SQL, decoding every cell by its runtime storage class.

use crate::error::{AgentError, Result};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A file on disk
    File(PathBuf),
    /// A private in-memory database
    Memory,
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
            DatabaseLocation::Memory => write!(f, ":memory:"),
        }
    }
}

/// Rows returned by a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names, in select-list order
    pub columns: Vec<String>,
    /// One entry per row, aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Long-lived database handle
///
/// The pool holds a single connection that never expires, so it behaves
/// like one open handle for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    location: DatabaseLocation,
    read_only: bool,
}

impl Database {
    /// Open an existing database file
    pub async fn open(path: &Path, read_only: bool) -> Result<Self> {
        if !path.exists() {
            return Err(AgentError::DatabaseNotFound(path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(read_only)
            .foreign_keys(true);

        let pool = Self::pool_options().connect_with(options).await?;
        info!(path = %path.display(), read_only, "Opened database");

        Ok(Self {
            pool,
            location: DatabaseLocation::File(path.to_path_buf()),
            read_only,
        })
    }

    /// Create (or open) a writable database file
    pub async fn create(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .foreign_keys(true);

        let pool = Self::pool_options().connect_with(options).await?;
        info!(path = %path.display(), "Created database");

        Ok(Self {
            pool,
            location: DatabaseLocation::File(path.to_path_buf()),
            read_only: false,
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = Self::pool_options().connect_with(options).await?;

        Ok(Self {
            pool,
            location: DatabaseLocation::Memory,
            read_only: false,
        })
    }

    fn pool_options() -> SqlitePoolOptions {
        // One connection: an in-memory database only exists per connection
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Run a statement and collect every row
    ///
    /// Any failure is reported as a query-execution error carrying the SQL.
    pub async fn run_query(&self, sql: &str) -> Result<QueryResult> {
        debug!(sql, "Executing query");

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AgentError::QueryExecution {
                sql: sql.to_string(),
                message: describe_sqlx_error(&e),
            })?;

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => self.describe_columns(sql).await,
        };

        let rows = rows.iter().map(decode_row).collect::<Vec<_>>();
        debug!(rows = rows.len(), "Query finished");

        Ok(QueryResult { columns, rows })
    }

    /// Column names of a statement that returned nothing
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        use sqlx::Executor;

        match self.pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe result columns");
                Vec::new()
            }
        }
    }

    /// Close the pool, waiting for the connection to be released
    pub async fn close(&self) {
        self.pool.close().await;
        debug!(location = %self.location, "Closed database");
    }
}

fn describe_sqlx_error(error: &sqlx::Error) -> String {
    match error {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

fn decode_row(row: &SqliteRow) -> Vec<Value> {
    (0..row.columns().len())
        .map(|idx| decode_cell(row, idx))
        .collect()
}

/// Decode one cell by the storage class of the stored value
///
/// SQLite is dynamically typed, so the declared column type (or its absence
/// for expressions like `COUNT(*)`) says little about what is stored.
fn decode_cell(row: &SqliteRow, idx: usize) -> Value {
    let storage_class = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(idx)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
