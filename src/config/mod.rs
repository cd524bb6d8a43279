//! Configuration management
//!
//! This module handles the YAML configuration document shared by the whole
//! process. Configuration can be loaded from:
//! - config.yaml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The database
//! sections (`mysql`, `postgresql`, `sqlite`) are written back by the
//! bootstrap sequence through [`ConfigStore::persist`].

pub mod store;

pub use store::ConfigStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// System configuration, including the engine selector
    #[serde(default)]
    pub system: SystemConfig,
    /// MySQL connection section
    #[serde(default)]
    pub mysql: MysqlConfig,
    /// PostgreSQL connection section
    #[serde(default)]
    pub postgresql: PgsqlConfig,
    /// SQLite connection section
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

/// System configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemConfig {
    /// Deployment environment label
    #[serde(default = "default_env")]
    pub env: String,
    /// Port the surrounding HTTP service listens on
    #[serde(default = "default_addr")]
    pub addr: u16,
    /// Which database section is authoritative
    #[serde(default)]
    pub db_type: DatabaseDriver,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            env: default_env(),
            addr: default_addr(),
            db_type: DatabaseDriver::default(),
        }
    }
}

fn default_env() -> String {
    "public".to_string()
}

fn default_addr() -> u16 {
    8888
}

fn default_max_idle_conns() -> u32 {
    10
}

fn default_max_open_conns() -> u32 {
    100
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// MySQL (default)
    #[default]
    Mysql,
    /// PostgreSQL
    Postgres,
    /// SQLite, file backed
    Sqlite,
}

impl DatabaseDriver {
    /// Tag used in requests and in the `db-type` config key
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDriver::Mysql => "mysql",
            DatabaseDriver::Postgres => "postgres",
            DatabaseDriver::Sqlite => "sqlite",
        }
    }

    /// Permissive lookup used for incoming initialization requests.
    ///
    /// An unrecognized tag resolves to MySQL. The fallback is logged so a
    /// typo in the request is at least visible in the server log.
    pub fn from_tag(tag: &str) -> Self {
        match tag.parse() {
            Ok(driver) => driver,
            Err(_) => {
                tracing::warn!(
                    tag = %tag,
                    fallback = DatabaseDriver::Mysql.as_str(),
                    "Unknown database driver tag, falling back to default driver"
                );
                DatabaseDriver::Mysql
            }
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" => Ok(DatabaseDriver::Mysql),
            "postgres" | "postgresql" => Ok(DatabaseDriver::Postgres),
            "sqlite" => Ok(DatabaseDriver::Sqlite),
            other => Err(ConfigError::ValidationError(format!(
                "unsupported database driver '{}'",
                other
            ))),
        }
    }
}

/// MySQL connection section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MysqlConfig {
    /// Server address as `host:port`
    #[serde(default = "default_mysql_path")]
    pub path: String,
    /// Extra connection parameters, URL query syntax
    #[serde(default = "default_mysql_options")]
    pub config: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: u32,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            path: default_mysql_path(),
            config: default_mysql_options(),
            db_name: String::new(),
            username: default_username(),
            password: String::new(),
            max_idle_conns: default_max_idle_conns(),
            max_open_conns: default_max_open_conns(),
        }
    }
}

fn default_mysql_path() -> String {
    "127.0.0.1:3306".to_string()
}

fn default_mysql_options() -> String {
    "charset=utf8mb4".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

impl MysqlConfig {
    /// Connection URL selecting the configured database
    pub fn dsn(&self) -> String {
        with_query(
            format!(
                "mysql://{}@{}/{}",
                userinfo(&self.username, &self.password),
                self.path,
                urlencoding::encode(&self.db_name)
            ),
            &self.config,
        )
    }
}

/// PostgreSQL connection section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PgsqlConfig {
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: String,
    /// Extra connection parameters, URL query syntax
    #[serde(default = "default_pg_options")]
    pub config: String,
    #[serde(default)]
    pub db_name: String,
    #[serde(default = "default_pg_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: u32,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
    /// Disable the prepared statement cache so statements go out unprepared
    #[serde(default)]
    pub prefer_simple_protocol: bool,
}

impl Default for PgsqlConfig {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            config: default_pg_options(),
            db_name: String::new(),
            username: default_pg_username(),
            password: String::new(),
            max_idle_conns: default_max_idle_conns(),
            max_open_conns: default_max_open_conns(),
            prefer_simple_protocol: false,
        }
    }
}

fn default_pg_host() -> String {
    "127.0.0.1".to_string()
}

fn default_pg_port() -> String {
    "5432".to_string()
}

fn default_pg_options() -> String {
    "sslmode=disable".to_string()
}

fn default_pg_username() -> String {
    "postgres".to_string()
}

impl PgsqlConfig {
    /// Connection URL selecting the configured database
    pub fn dsn(&self) -> String {
        with_query(
            format!(
                "postgres://{}@{}:{}/{}",
                userinfo(&self.username, &self.password),
                self.host,
                self.port,
                urlencoding::encode(&self.db_name)
            ),
            &self.config,
        )
    }
}

/// SQLite connection section
///
/// `db-name` is a file stem; the database lives at `<db-name>.db` and may
/// include a directory component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SqliteConfig {
    #[serde(default)]
    pub db_name: String,
    #[serde(default = "default_sqlite_options")]
    pub config: String,
    #[serde(default = "default_sqlite_idle_conns")]
    pub max_idle_conns: u32,
    #[serde(default = "default_sqlite_open_conns")]
    pub max_open_conns: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_name: String::new(),
            config: default_sqlite_options(),
            max_idle_conns: default_sqlite_idle_conns(),
            max_open_conns: default_sqlite_open_conns(),
        }
    }
}

fn default_sqlite_options() -> String {
    "mode=rwc".to_string()
}

fn default_sqlite_idle_conns() -> u32 {
    1
}

fn default_sqlite_open_conns() -> u32 {
    5
}

impl SqliteConfig {
    /// Path of the database file
    pub fn file_path(&self) -> String {
        format!("{}.db", self.db_name)
    }

    pub fn dsn(&self) -> String {
        with_query(format!("sqlite://{}", self.file_path()), &self.config)
    }
}

fn userinfo(username: &str, password: &str) -> String {
    if password.is_empty() {
        urlencoding::encode(username).into_owned()
    } else {
        format!(
            "{}:{}",
            urlencoding::encode(username),
            urlencoding::encode(password)
        )
    }
}

fn with_query(base: String, query: &str) -> String {
    let query = query.trim().trim_start_matches('?');
    if query.is_empty() {
        base
    } else {
        format!("{}?{}", base, query)
    }
}

/// Engine-specific connection configuration produced by a driver adapter.
///
/// Exactly one variant is active at a time; [`Config::apply`] stores it in
/// the matching section and points `system.db-type` at it.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConfig {
    Mysql(MysqlConfig),
    Postgres(PgsqlConfig),
    Sqlite(SqliteConfig),
}

impl ResolvedConfig {
    pub fn driver(&self) -> DatabaseDriver {
        match self {
            ResolvedConfig::Mysql(_) => DatabaseDriver::Mysql,
            ResolvedConfig::Postgres(_) => DatabaseDriver::Postgres,
            ResolvedConfig::Sqlite(_) => DatabaseDriver::Sqlite,
        }
    }

    pub fn db_name(&self) -> &str {
        match self {
            ResolvedConfig::Mysql(c) => &c.db_name,
            ResolvedConfig::Postgres(c) => &c.db_name,
            ResolvedConfig::Sqlite(c) => &c.db_name,
        }
    }

    /// Connection URL selecting the target database
    pub fn dsn(&self) -> String {
        match self {
            ResolvedConfig::Mysql(c) => c.dsn(),
            ResolvedConfig::Postgres(c) => c.dsn(),
            ResolvedConfig::Sqlite(c) => c.dsn(),
        }
    }

    /// Configured `(max_idle, max_open)` connection limits
    pub fn pool_limits(&self) -> (u32, u32) {
        match self {
            ResolvedConfig::Mysql(c) => (c.max_idle_conns, c.max_open_conns),
            ResolvedConfig::Postgres(c) => (c.max_idle_conns, c.max_open_conns),
            ResolvedConfig::Sqlite(c) => (c.max_idle_conns, c.max_open_conns),
        }
    }

    /// Reject configurations that cannot select a database.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_name().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to write config file '{path}': {source}")]
    FileWrite {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(String),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - BEDROCK_SYSTEM_DB_TYPE
    /// - BEDROCK_MYSQL_PATH, BEDROCK_MYSQL_DB_NAME, BEDROCK_MYSQL_USERNAME, BEDROCK_MYSQL_PASSWORD
    /// - BEDROCK_POSTGRESQL_HOST, BEDROCK_POSTGRESQL_PORT, BEDROCK_POSTGRESQL_DB_NAME,
    ///   BEDROCK_POSTGRESQL_USERNAME, BEDROCK_POSTGRESQL_PASSWORD
    /// - BEDROCK_SQLITE_DB_NAME
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(driver) = std::env::var("BEDROCK_SYSTEM_DB_TYPE") {
            // Invalid values are ignored
            if let Ok(driver) = driver.parse() {
                self.system.db_type = driver;
            }
        }

        if let Ok(path) = std::env::var("BEDROCK_MYSQL_PATH") {
            self.mysql.path = path;
        }
        if let Ok(db_name) = std::env::var("BEDROCK_MYSQL_DB_NAME") {
            self.mysql.db_name = db_name;
        }
        if let Ok(username) = std::env::var("BEDROCK_MYSQL_USERNAME") {
            self.mysql.username = username;
        }
        if let Ok(password) = std::env::var("BEDROCK_MYSQL_PASSWORD") {
            self.mysql.password = password;
        }

        if let Ok(host) = std::env::var("BEDROCK_POSTGRESQL_HOST") {
            self.postgresql.host = host;
        }
        if let Ok(port) = std::env::var("BEDROCK_POSTGRESQL_PORT") {
            self.postgresql.port = port;
        }
        if let Ok(db_name) = std::env::var("BEDROCK_POSTGRESQL_DB_NAME") {
            self.postgresql.db_name = db_name;
        }
        if let Ok(username) = std::env::var("BEDROCK_POSTGRESQL_USERNAME") {
            self.postgresql.username = username;
        }
        if let Ok(password) = std::env::var("BEDROCK_POSTGRESQL_PASSWORD") {
            self.postgresql.password = password;
        }

        if let Ok(db_name) = std::env::var("BEDROCK_SQLITE_DB_NAME") {
            self.sqlite.db_name = db_name;
        }
    }

    /// The section selected by `system.db-type`
    pub fn active_connection(&self) -> ResolvedConfig {
        match self.system.db_type {
            DatabaseDriver::Mysql => ResolvedConfig::Mysql(self.mysql.clone()),
            DatabaseDriver::Postgres => ResolvedConfig::Postgres(self.postgresql.clone()),
            DatabaseDriver::Sqlite => ResolvedConfig::Sqlite(self.sqlite.clone()),
        }
    }

    /// Store `resolved` in its section and make that section authoritative.
    pub fn apply(&mut self, resolved: &ResolvedConfig) {
        self.system.db_type = resolved.driver();
        match resolved {
            ResolvedConfig::Mysql(c) => self.mysql = c.clone(),
            ResolvedConfig::Postgres(c) => self.postgresql = c.clone(),
            ResolvedConfig::Sqlite(c) => self.sqlite = c.clone(),
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
pub(crate) static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
