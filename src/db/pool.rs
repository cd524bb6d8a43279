//! Database connection pool abstraction
//!
//! This module provides a unified interface for database operations that works
//! with MySQL, PostgreSQL and SQLite backends. The appropriate pool is created
//! from the active [`ResolvedConfig`] variant.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions},
    pool::PoolOptions,
    postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, Postgres},
    query::Query,
    sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Executor, Row,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::bootstrap::BootstrapError;
use crate::config::{DatabaseDriver, MysqlConfig, PgsqlConfig, ResolvedConfig, SqliteConfig};
use crate::db::dialect::{self, count_matching_sql, insert_sql, Dialect};
use crate::db::driver::mask_dsn;
use crate::db::seed::SeedValue;
use crate::db::shared::ConnectionSlot;

/// Database pool trait that abstracts over different database backends.
///
/// Besides raw execution it exposes the small amount of catalog introspection
/// and parameterized row access that schema convergence and seeding need.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL statement that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check if the database connection is healthy
    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    fn dialect(&self) -> &'static dyn Dialect;

    /// Whether convergence should emit foreign key constraints
    fn foreign_key_constraints(&self) -> bool;

    /// Column names of `table`, empty when the table does not exist
    async fn table_columns(&self, table: &str) -> Result<Vec<String>>;

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool>;

    /// Number of rows in `table` matching every `(column, value)` pair
    async fn count_matching(&self, table: &str, filter: &[(&str, SeedValue)]) -> Result<i64>;

    async fn insert_row(&self, table: &str, row: &[(&str, SeedValue)]) -> Result<u64>;

    /// Get the underlying SQLite pool if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool>;
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Idle/open connection limits from the resolved configuration.
///
/// Applied best-effort: a zero `max_open` keeps the driver default. sqlx
/// has no cap on idle connections, so `max_idle` is only recorded; the
/// pool still reaps idle connections through its own idle timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_idle: u32,
    pub max_open: u32,
}

impl PoolLimits {
    pub fn new(max_idle: u32, max_open: u32) -> Self {
        Self { max_idle, max_open }
    }

    pub fn apply<DB: sqlx::Database>(&self, options: PoolOptions<DB>) -> PoolOptions<DB> {
        let mut options = options;
        if self.max_open > 0 {
            options = options.max_connections(self.max_open);
        } else {
            tracing::debug!("max-open-conns is 0, keeping driver default");
        }

        if self.max_idle > 0 {
            tracing::debug!(
                max_idle = self.max_idle,
                "sqlx has no idle connection cap, max-idle-conns not applied"
            );
        }
        options
    }
}

impl From<&ResolvedConfig> for PoolLimits {
    fn from(config: &ResolvedConfig) -> Self {
        let (max_idle, max_open) = config.pool_limits();
        Self::new(max_idle, max_open)
    }
}

/// Create the parent directory of a SQLite database file if needed.
pub(crate) fn ensure_sqlite_dir(file_path: &str) -> std::io::Result<()> {
    if let Some(parent) = std::path::Path::new(file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ============================================================================
// MySQL
// ============================================================================

/// MySQL connection pool implementation
pub struct MysqlDatabase {
    pool: MySqlPool,
    foreign_keys: bool,
}

impl MysqlDatabase {
    /// Create a new MySQL connection pool for `config.db_name`
    pub async fn connect(config: &MysqlConfig, foreign_keys: bool) -> Result<Self, sqlx::Error> {
        // The raw name wins over the URL path, which sqlx does not percent-decode
        let options = MySqlConnectOptions::from_str(&config.dsn())?.database(&config.db_name);
        let limits = PoolLimits::new(config.max_idle_conns, config.max_open_conns);

        let pool = limits
            .apply(MySqlPoolOptions::new())
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // sqlx pins sessions to UTC; follow the server's local zone instead
                    conn.execute("SET time_zone = @@global.time_zone").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        Ok(Self { pool, foreign_keys })
    }
}

fn bind_mysql<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SeedValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SeedValue::Int(v) => query.bind(*v),
        SeedValue::Text(v) => query.bind(v.as_str()),
        SeedValue::Bool(v) => query.bind(*v),
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = self
            .pool
            .execute(query)
            .await
            .with_context(|| format!("Failed to execute query: {}", truncate_sql(query)))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::MYSQL
    }

    fn foreign_key_constraints(&self) -> bool {
        self.foreign_keys
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT CAST(COLUMN_NAME AS CHAR) AS name FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read columns of {}", table))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = ?",
        )
        .bind(table)
        .bind(index)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to look up index {}", index))?;
        Ok(count > 0)
    }

    async fn count_matching(&self, table: &str, filter: &[(&str, SeedValue)]) -> Result<i64> {
        let columns: Vec<&str> = filter.iter().map(|(column, _)| *column).collect();
        let sql = count_matching_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in filter {
            query = bind_mysql(query, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn insert_row(&self, table: &str, row: &[(&str, SeedValue)]) -> Result<u64> {
        let columns: Vec<&str> = row.iter().map(|(column, _)| *column).collect();
        let sql = insert_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in row {
            query = bind_mysql(query, value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert into {}", table))?;
        Ok(result.rows_affected())
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// PostgreSQL connection pool implementation
pub struct PostgresDatabase {
    pool: PgPool,
    foreign_keys: bool,
}

impl PostgresDatabase {
    /// Create a new PostgreSQL connection pool for `config.db_name`
    pub async fn connect(config: &PgsqlConfig, foreign_keys: bool) -> Result<Self, sqlx::Error> {
        let mut options = PgConnectOptions::from_str(&config.dsn())?.database(&config.db_name);
        if config.prefer_simple_protocol {
            options = options.statement_cache_capacity(0);
        }
        let limits = PoolLimits::new(config.max_idle_conns, config.max_open_conns);

        let pool = limits
            .apply(PgPoolOptions::new())
            .connect_with(options)
            .await?;

        Ok(Self { pool, foreign_keys })
    }
}

fn bind_postgres<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SeedValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SeedValue::Int(v) => query.bind(*v),
        SeedValue::Text(v) => query.bind(v.as_str()),
        SeedValue::Bool(v) => query.bind(*v),
    }
}

#[async_trait]
impl DatabasePool for PostgresDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = self
            .pool
            .execute(query)
            .await
            .with_context(|| format!("Failed to execute query: {}", truncate_sql(query)))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Postgres
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::POSTGRES
    }

    fn foreign_key_constraints(&self) -> bool {
        self.foreign_keys
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read columns of {}", table))?;
        Ok(columns)
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = $1 AND indexname = $2",
        )
        .bind(table)
        .bind(index)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to look up index {}", index))?;
        Ok(count > 0)
    }

    async fn count_matching(&self, table: &str, filter: &[(&str, SeedValue)]) -> Result<i64> {
        let columns: Vec<&str> = filter.iter().map(|(column, _)| *column).collect();
        let sql = count_matching_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in filter {
            query = bind_postgres(query, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn insert_row(&self, table: &str, row: &[(&str, SeedValue)]) -> Result<u64> {
        let columns: Vec<&str> = row.iter().map(|(column, _)| *column).collect();
        let sql = insert_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in row {
            query = bind_postgres(query, value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert into {}", table))?;
        Ok(result.rows_affected())
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
    foreign_keys: bool,
}

impl SqliteDatabase {
    /// Create a new SQLite connection pool, creating the file if needed
    pub async fn connect(config: &SqliteConfig, foreign_keys: bool) -> Result<Self, sqlx::Error> {
        ensure_sqlite_dir(&config.file_path())?;

        let options = SqliteConnectOptions::from_str(&config.dsn())?
            .create_if_missing(true)
            .foreign_keys(foreign_keys);
        let limits = PoolLimits::new(config.max_idle_conns, config.max_open_conns);

        let pool = limits
            .apply(SqlitePoolOptions::new())
            .connect_with(options)
            .await?;

        Ok(Self { pool, foreign_keys })
    }

    /// In-memory database on a single connection
    pub async fn memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool,
            foreign_keys: false,
        })
    }
}

fn bind_sqlite<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SeedValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SeedValue::Int(v) => query.bind(*v),
        SeedValue::Text(v) => query.bind(v.as_str()),
        SeedValue::Bool(v) => query.bind(*v),
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = self
            .pool
            .execute(query)
            .await
            .with_context(|| format!("Failed to execute query: {}", truncate_sql(query)))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::SQLITE
    }

    fn foreign_key_constraints(&self) -> bool {
        self.foreign_keys
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read columns of {}", table))?;
        Ok(columns)
    }

    async fn index_exists(&self, table: &str, index: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?",
        )
        .bind(table)
        .bind(index)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to look up index {}", index))?;
        Ok(count > 0)
    }

    async fn count_matching(&self, table: &str, filter: &[(&str, SeedValue)]) -> Result<i64> {
        let columns: Vec<&str> = filter.iter().map(|(column, _)| *column).collect();
        let sql = count_matching_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in filter {
            query = bind_sqlite(query, value);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    async fn insert_row(&self, table: &str, row: &[(&str, SeedValue)]) -> Result<u64> {
        let columns: Vec<&str> = row.iter().map(|(column, _)| *column).collect();
        let sql = insert_sql(self.dialect(), table, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in row {
            query = bind_sqlite(query, value);
        }
        let result = query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert into {}", table))?;
        Ok(result.rows_affected())
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &sql[..cut]),
        None => sql.to_string(),
    }
}

/// Create a database connection pool for the active configuration.
///
/// `foreign_keys` controls whether schema convergence on this pool emits
/// foreign key constraints (and, for SQLite, whether they are enforced).
pub async fn create_pool(
    config: &ResolvedConfig,
    foreign_keys: bool,
) -> Result<DynDatabasePool, sqlx::Error> {
    match config {
        ResolvedConfig::Mysql(c) => Ok(Arc::new(MysqlDatabase::connect(c, foreign_keys).await?)),
        ResolvedConfig::Postgres(c) => {
            Ok(Arc::new(PostgresDatabase::connect(c, foreign_keys).await?))
        }
        ResolvedConfig::Sqlite(c) => Ok(Arc::new(SqliteDatabase::connect(c, foreign_keys).await?)),
    }
}

/// Open the pooled connection for `config` and publish it in `slot`.
///
/// The database name is checked before any network activity. Foreign key
/// constraints are relaxed so entities can be converged in any order. On
/// failure the slot is left untouched.
pub async fn open_shared(
    config: &ResolvedConfig,
    slot: &ConnectionSlot,
) -> Result<DynDatabasePool, BootstrapError> {
    config.validate().map_err(BootstrapError::validation)?;

    if slot.is_initialized() {
        return Err(BootstrapError::AlreadyInitialized);
    }

    let pool = create_pool(config, false)
        .await
        .map_err(|source| BootstrapError::Connectivity {
            driver: config.driver(),
            target: mask_dsn(&config.dsn()),
            source,
        })?;

    slot.install(pool.clone())?;

    let limits = PoolLimits::from(config);
    tracing::info!(
        driver = %config.driver(),
        database = %config.db_name(),
        max_idle = limits.max_idle,
        max_open = limits.max_open,
        "Pooled connection opened"
    );
    Ok(pool)
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let db = SqliteDatabase::memory()
        .await
        .context("Failed to open in-memory SQLite database")?;
    Ok(Arc::new(db))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_config(dir: &std::path::Path, name: &str) -> ResolvedConfig {
        ResolvedConfig::Sqlite(SqliteConfig {
            db_name: dir.join(name).to_string_lossy().to_string(),
            ..SqliteConfig::default()
        })
    }

    #[test]
    fn test_pool_limits_cap_open_connections() {
        let options = PoolLimits::new(50, 4).apply(SqlitePoolOptions::new());
        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_min_connections(), 0);
    }

    #[test]
    fn test_pool_limits_zero_open_keeps_default() {
        let default_max = SqlitePoolOptions::new().get_max_connections();
        let options = PoolLimits::new(2, 0).apply(SqlitePoolOptions::new());
        assert_eq!(options.get_max_connections(), default_max);
        assert_eq!(options.get_min_connections(), 0);
    }

    #[tokio::test]
    async fn test_idle_limit_does_not_hold_connections_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig {
            db_name: dir.path().join("idle").to_string_lossy().to_string(),
            max_idle_conns: 4,
            max_open_conns: 5,
            ..SqliteConfig::default()
        };

        let db = SqliteDatabase::connect(&config, false).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let pool = db.as_sqlite().unwrap();
        assert!(pool.size() <= 1, "pool held {} connections", pool.size());
    }

    #[test]
    fn test_truncate_sql() {
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
    }

    #[tokio::test]
    async fn test_open_shared_publishes_pool() {
        let dir = tempfile::tempdir().unwrap();
        let slot = ConnectionSlot::new();

        let pool = open_shared(&sqlite_config(dir.path(), "nested/app"), &slot)
            .await
            .expect("Failed to open pool");

        assert!(slot.is_initialized());
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(!pool.foreign_key_constraints());
        slot.get().unwrap().ping().await.expect("Ping should succeed");
        assert!(dir.path().join("nested").join("app.db").exists());

        let enforced: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(enforced, 0);
    }

    #[tokio::test]
    async fn test_open_shared_rejects_empty_db_name_before_connecting() {
        let slot = ConnectionSlot::new();
        // Unroutable address: reaching the network would hang or fail differently
        let config = ResolvedConfig::Mysql(MysqlConfig {
            path: "10.255.255.1:3306".to_string(),
            db_name: String::new(),
            ..MysqlConfig::default()
        });

        let err = match open_shared(&config, &slot).await {
            Ok(_) => panic!("empty database name should be rejected"),
            Err(err) => err,
        };
        assert!(matches!(err, BootstrapError::ConfigValidation(_)));
        assert_eq!(err.to_string(), "Invalid configuration: database name must not be empty");
        assert!(!slot.is_initialized());
    }

    #[tokio::test]
    async fn test_open_shared_refuses_second_install() {
        let dir = tempfile::tempdir().unwrap();
        let slot = ConnectionSlot::new();

        open_shared(&sqlite_config(dir.path(), "first"), &slot)
            .await
            .unwrap();
        let err = open_shared(&sqlite_config(dir.path(), "second"), &slot)
            .await
            .err()
            .expect("second install should be refused");

        assert!(matches!(err, BootstrapError::AlreadyInitialized));
        assert!(!dir.path().join("second.db").exists());
    }

    #[tokio::test]
    async fn test_sqlite_row_helpers() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, on_duty BOOLEAN)")
            .await
            .unwrap();

        let row = [
            ("id", SeedValue::Int(7)),
            ("name", SeedValue::from("ops")),
            ("on_duty", SeedValue::Bool(true)),
        ];
        assert_eq!(pool.insert_row("t", &row).await.unwrap(), 1);

        assert_eq!(pool.count_matching("t", &row[1..2]).await.unwrap(), 1);
        assert_eq!(
            pool.count_matching("t", &[("name", SeedValue::from("dev"))])
                .await
                .unwrap(),
            0
        );
        assert!(!pool.index_exists("t", "idx_t_name").await.unwrap());
    }

    // MySQL and PostgreSQL tests need a running server.
    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let password = std::env::var("BEDROCK_TEST_MYSQL_PASSWORD").unwrap_or_default();
        let config = ResolvedConfig::Mysql(MysqlConfig {
            db_name: "mysql".to_string(),
            password,
            ..MysqlConfig::default()
        });

        let pool = create_pool(&config, false).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_pool_creation() {
        let password = std::env::var("BEDROCK_TEST_PG_PASSWORD").unwrap_or_default();
        let config = ResolvedConfig::Postgres(PgsqlConfig {
            db_name: "postgres".to_string(),
            password,
            prefer_simple_protocol: true,
            ..PgsqlConfig::default()
        });

        let pool = create_pool(&config, false).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Postgres);
        pool.ping().await.expect("Ping should succeed");
    }
}
