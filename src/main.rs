//! Bedrock - database bootstrap for the admin console

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bedrock::{
    bootstrap::Bootstrapper,
    catalog,
    config::ConfigStore,
    db::{self, driver::ConnectionRequest, schema},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bedrock=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::var("BEDROCK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let store = ConfigStore::open(&path)?;
    tracing::info!(path = %path, "Configuration loaded");

    let slot = db::shared::global();

    if store.needs_init() {
        let Some(request) = request_from_env() else {
            tracing::warn!("Database is not configured; set BEDROCK_INIT_DBNAME to initialize it");
            return Ok(());
        };

        let report = Bootstrapper::with_catalog(&store, slot).run(&request).await?;
        tracing::info!(
            driver = %report.driver,
            database = %report.database,
            tables_created = report.schema.tables_created.len(),
            rows_seeded = report.seeds.rows_inserted(),
            "Database initialized"
        );
    } else {
        let config = store.snapshot().active_connection();
        let pool = db::open_shared(&config, slot).await?;
        schema::converge(&pool, catalog::ENTITIES).await?;
        pool.ping().await?;
        tracing::info!(driver = %config.driver(), database = %config.db_name(), "Database ready");
    }

    Ok(())
}

/// Initialization request from `BEDROCK_INIT_*`, if a database name is set
fn request_from_env() -> Option<ConnectionRequest> {
    let var = |name: &str| std::env::var(format!("BEDROCK_INIT_{}", name)).unwrap_or_default();

    let db_name = var("DBNAME");
    if db_name.is_empty() {
        return None;
    }

    Some(ConnectionRequest {
        db_type: var("ENGINE"),
        host: var("HOST"),
        port: var("PORT"),
        user_name: var("USER"),
        password: var("PASSWORD"),
        db_name,
    })
}
