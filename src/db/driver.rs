//! Engine adapters
//!
//! A [`DriverAdapter`] turns a raw [`ConnectionRequest`] into everything the
//! bootstrap sequence needs for one engine: the administrative DSN, the
//! create-database statement and the [`ResolvedConfig`] that is later used
//! to open the pool and is written to the config file.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{AnyConnection, Connection};

use crate::config::{DatabaseDriver, MysqlConfig, PgsqlConfig, ResolvedConfig, SqliteConfig};
use crate::db::dialect::{self, Dialect};
use crate::db::pool::ensure_sqlite_dir;

/// Loopback address used when the request leaves the host empty
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Connection parameters as submitted by an administrator
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionRequest {
    /// Engine tag, resolved permissively by [`DatabaseDriver::from_tag`]
    pub db_type: String,
    pub host: String,
    pub port: String,
    pub user_name: String,
    pub password: String,
    pub db_name: String,
}

impl std::fmt::Debug for ConnectionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRequest")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .field("db_name", &self.db_name)
            .finish()
    }
}

impl ConnectionRequest {
    /// Copy of the request with an empty host or port filled in.
    pub fn with_defaults(&self, default_port: &str) -> Self {
        let mut request = self.clone();
        if request.host.trim().is_empty() {
            request.host = DEFAULT_HOST.to_string();
        }
        if request.port.trim().is_empty() {
            request.port = default_port.to_string();
        }
        request
    }
}

/// Output of [`DriverAdapter::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Server-level DSN that does not select the target database
    pub admin_dsn: String,
    pub create_statement: String,
    pub config: ResolvedConfig,
}

/// Per-engine resolution and administrative access
#[async_trait]
pub trait DriverAdapter: Send + Sync {
    fn driver(&self) -> DatabaseDriver;

    fn default_port(&self) -> &'static str;

    fn dialect(&self) -> &'static dyn Dialect;

    /// `request` already has its defaults applied
    fn admin_dsn(&self, request: &ConnectionRequest) -> String;

    fn create_statement(&self, db_name: &str) -> String;

    /// `request` already has its defaults applied
    fn resolved_config(&self, request: &ConnectionRequest) -> ResolvedConfig;

    fn resolve(&self, request: &ConnectionRequest) -> Resolution {
        let request = request.with_defaults(self.default_port());
        Resolution {
            admin_dsn: self.admin_dsn(&request),
            create_statement: self.create_statement(&request.db_name),
            config: self.resolved_config(&request),
        }
    }

    /// Open a single unpooled connection to `dsn`.
    async fn open_admin(&self, dsn: &str) -> Result<AnyConnection, sqlx::Error> {
        sqlx::any::install_default_drivers();
        AnyConnection::connect(dsn).await
    }
}

fn or_default(value: &str, default: String) -> String {
    if value.is_empty() {
        default
    } else {
        value.to_string()
    }
}

fn credentials(username: &str, password: &str) -> String {
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

pub struct MysqlAdapter;

impl DriverAdapter for MysqlAdapter {
    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn default_port(&self) -> &'static str {
        "3306"
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::MYSQL
    }

    fn admin_dsn(&self, request: &ConnectionRequest) -> String {
        let defaults = MysqlConfig::default();
        format!(
            "mysql://{}@{}:{}/",
            credentials(&or_default(&request.user_name, defaults.username), &request.password),
            request.host,
            request.port
        )
    }

    fn create_statement(&self, db_name: &str) -> String {
        format!(
            "CREATE DATABASE IF NOT EXISTS {} DEFAULT CHARACTER SET utf8mb4 DEFAULT COLLATE utf8mb4_general_ci;",
            self.dialect().quote_ident(db_name)
        )
    }

    fn resolved_config(&self, request: &ConnectionRequest) -> ResolvedConfig {
        let defaults = MysqlConfig::default();
        ResolvedConfig::Mysql(MysqlConfig {
            path: format!("{}:{}", request.host, request.port),
            db_name: request.db_name.clone(),
            username: or_default(&request.user_name, defaults.username.clone()),
            password: request.password.clone(),
            ..defaults
        })
    }
}

pub struct PostgresAdapter;

impl DriverAdapter for PostgresAdapter {
    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Postgres
    }

    fn default_port(&self) -> &'static str {
        "5432"
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::POSTGRES
    }

    /// Targets the `postgres` maintenance database, which every server has.
    fn admin_dsn(&self, request: &ConnectionRequest) -> String {
        let defaults = PgsqlConfig::default();
        format!(
            "postgres://{}@{}:{}/postgres?{}",
            credentials(&or_default(&request.user_name, defaults.username), &request.password),
            request.host,
            request.port,
            defaults.config
        )
    }

    fn create_statement(&self, db_name: &str) -> String {
        format!("CREATE DATABASE {};", self.dialect().quote_ident(db_name))
    }

    fn resolved_config(&self, request: &ConnectionRequest) -> ResolvedConfig {
        let defaults = PgsqlConfig::default();
        ResolvedConfig::Postgres(PgsqlConfig {
            host: request.host.clone(),
            port: request.port.clone(),
            db_name: request.db_name.clone(),
            username: or_default(&request.user_name, defaults.username.clone()),
            password: request.password.clone(),
            ..defaults
        })
    }
}

/// File-backed engine. Host, port and credentials are ignored.
pub struct SqliteAdapter;

#[async_trait]
impl DriverAdapter for SqliteAdapter {
    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn default_port(&self) -> &'static str {
        ""
    }

    fn dialect(&self) -> &'static dyn Dialect {
        &dialect::SQLITE
    }

    fn admin_dsn(&self, request: &ConnectionRequest) -> String {
        self.resolved_config(request).dsn()
    }

    fn create_statement(&self, _db_name: &str) -> String {
        "PRAGMA encoding = 'UTF-8'".to_string()
    }

    fn resolved_config(&self, request: &ConnectionRequest) -> ResolvedConfig {
        ResolvedConfig::Sqlite(SqliteConfig {
            db_name: request.db_name.clone(),
            ..SqliteConfig::default()
        })
    }

    async fn open_admin(&self, dsn: &str) -> Result<AnyConnection, sqlx::Error> {
        let path = dsn
            .trim_start_matches("sqlite://")
            .split('?')
            .next()
            .unwrap_or_default();
        ensure_sqlite_dir(path)?;

        sqlx::any::install_default_drivers();
        AnyConnection::connect(dsn).await
    }
}

static MYSQL_ADAPTER: MysqlAdapter = MysqlAdapter;
static POSTGRES_ADAPTER: PostgresAdapter = PostgresAdapter;
static SQLITE_ADAPTER: SqliteAdapter = SqliteAdapter;

pub fn adapter_for(driver: DatabaseDriver) -> &'static dyn DriverAdapter {
    match driver {
        DatabaseDriver::Mysql => &MYSQL_ADAPTER,
        DatabaseDriver::Postgres => &POSTGRES_ADAPTER,
        DatabaseDriver::Sqlite => &SQLITE_ADAPTER,
    }
}

/// Pick the adapter for the request's engine tag and resolve it.
pub fn resolve(request: &ConnectionRequest) -> (&'static dyn DriverAdapter, Resolution) {
    let adapter = adapter_for(DatabaseDriver::from_tag(&request.db_type));
    (adapter, adapter.resolve(request))
}

/// Replace the password in a DSN so it can be logged.
pub fn mask_dsn(dsn: &str) -> String {
    let Some(scheme_end) = dsn.find("://") else {
        return dsn.to_string();
    };
    let rest = &dsn[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return dsn.to_string();
    };
    let userinfo = &rest[..at];
    let Some(colon) = userinfo.find(':') else {
        return dsn.to_string();
    };

    format!(
        "{}{}:***{}",
        &dsn[..scheme_end + 3],
        &userinfo[..colon],
        &rest[at..]
    )
}
