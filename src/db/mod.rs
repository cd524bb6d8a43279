//! Database layer
//!
//! This module provides the database side of the bootstrap sequence for
//! MySQL, PostgreSQL and SQLite:
//! - [`driver`]: per-engine request resolution and administrative access
//! - [`provision`]: creating the target database
//! - [`pool`]: the pooled connection and its publication in a [`ConnectionSlot`]
//! - [`schema`]: additive schema convergence
//! - [`seed`]: ordered, idempotent baseline data
//!
//! # Architecture
//!
//! Every engine sits behind the `DatabasePool` trait, and all SQL text is
//! rendered through a [`dialect::Dialect`], so the convergence and seeding
//! code never branches on the engine.
//!
//! # Usage
//!
//! ```ignore
//! use bedrock::config::Config;
//! use bedrock::db::{self, open_shared, schema};
//!
//! let config = Config::load_with_env(Path::new("config.yaml"))?;
//! let pool = open_shared(&config.active_connection(), db::shared::global()).await?;
//!
//! schema::converge(&pool, bedrock::catalog::ENTITIES).await?;
//! pool.ping().await?;
//! ```

pub mod dialect;
pub mod driver;
pub mod pool;
pub mod provision;
pub mod schema;
pub mod seed;
pub mod shared;

pub use pool::{
    create_pool, create_test_pool, open_shared, DatabasePool, DynDatabasePool, MysqlDatabase,
    PoolLimits, PostgresDatabase, SqliteDatabase,
};
pub use shared::ConnectionSlot;
