//! First-run database bootstrap
//!
//! Drives one initialization request through the whole sequence:
//!
//! ```text
//! Unprovisioned -> Provisioned -> PooledOpen -> SchemaConverged -> Seeded -> ConfigPersisted
//! ```
//!
//! Any step may fail, which ends the run in `Failed`. The resolved
//! configuration is persisted after the sequence on every path, so a failed
//! run still leaves its connection settings on disk for diagnosis.

mod error;

pub use error::BootstrapError;

use std::fmt;

use crate::catalog;
use crate::config::{ConfigStore, DatabaseDriver};
use crate::db::driver::{self, ConnectionRequest, DriverAdapter, Resolution};
use crate::db::schema::{self, ConvergeReport, EntityDescriptor};
use crate::db::seed::{self, SeedReport, SeedStep};
use crate::db::{pool, provision, ConnectionSlot};

/// Where a bootstrap run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Unprovisioned,
    Provisioned,
    PooledOpen,
    SchemaConverged,
    Seeded,
    ConfigPersisted,
    Failed,
}

impl BootstrapStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapStage::Unprovisioned => "unprovisioned",
            BootstrapStage::Provisioned => "provisioned",
            BootstrapStage::PooledOpen => "pooled_open",
            BootstrapStage::SchemaConverged => "schema_converged",
            BootstrapStage::Seeded => "seeded",
            BootstrapStage::ConfigPersisted => "config_persisted",
            BootstrapStage::Failed => "failed",
        }
    }
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapReport {
    pub driver: DatabaseDriver,
    pub database: String,
    pub schema: ConvergeReport,
    pub seeds: SeedReport,
    pub stage: BootstrapStage,
}

/// Runs the bootstrap sequence against a config store and connection slot.
pub struct Bootstrapper<'a> {
    store: &'a ConfigStore,
    slot: &'a ConnectionSlot,
    entities: &'a [EntityDescriptor],
    steps: Vec<Box<dyn SeedStep>>,
}

impl<'a> Bootstrapper<'a> {
    /// Bootstrapper with no entities and no seed steps
    pub fn new(store: &'a ConfigStore, slot: &'a ConnectionSlot) -> Self {
        Self {
            store,
            slot,
            entities: &[],
            steps: Vec::new(),
        }
    }

    /// Bootstrapper for the built-in admin console catalog
    pub fn with_catalog(store: &'a ConfigStore, slot: &'a ConnectionSlot) -> Self {
        Self::new(store, slot)
            .entities(catalog::ENTITIES)
            .seed_steps(catalog::seeds::default_steps())
    }

    pub fn entities(mut self, entities: &'a [EntityDescriptor]) -> Self {
        self.entities = entities;
        self
    }

    pub fn seed_steps(mut self, steps: Vec<Box<dyn SeedStep>>) -> Self {
        self.steps = steps;
        self
    }

    /// Initialize the database described by `request`.
    ///
    /// Refuses to run once the slot holds a connection. Otherwise the
    /// resolved configuration is persisted whatever the outcome. When both
    /// the sequence and the persist fail, the sequence's error is returned.
    pub async fn run(&self, request: &ConnectionRequest) -> Result<BootstrapReport, BootstrapError> {
        if self.slot.is_initialized() {
            return Err(BootstrapError::AlreadyInitialized);
        }

        let (adapter, resolution) = driver::resolve(request);
        tracing::info!(
            driver = %adapter.driver(),
            database = %resolution.config.db_name(),
            "Starting database bootstrap"
        );

        let mut stage = BootstrapStage::Unprovisioned;
        let outcome = self.sequence(adapter, &resolution, &mut stage).await;
        let persisted = self.store.persist(&resolution.config);

        match (outcome, persisted) {
            (Ok(mut report), Ok(())) => {
                report.stage = BootstrapStage::ConfigPersisted;
                tracing::info!(
                    driver = %report.driver,
                    database = %report.database,
                    "Database bootstrap complete"
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => {
                tracing::error!(
                    error = %e,
                    "Database initialized but its configuration could not be written"
                );
                Err(BootstrapError::Persistence(e))
            }
            (Err(e), Ok(())) => {
                tracing::error!(
                    stage = %stage,
                    error = %e,
                    "Database bootstrap failed, configuration persisted for diagnosis"
                );
                Err(e)
            }
            (Err(e), Err(persist_err)) => {
                tracing::warn!(
                    error = %persist_err,
                    "Failed to persist configuration after bootstrap failure"
                );
                tracing::error!(stage = %stage, error = %e, "Database bootstrap failed");
                Err(e)
            }
        }
    }

    async fn sequence(
        &self,
        adapter: &dyn DriverAdapter,
        resolution: &Resolution,
        stage: &mut BootstrapStage,
    ) -> Result<BootstrapReport, BootstrapError> {
        let result = self.steps_from(adapter, resolution, stage).await;
        if result.is_err() {
            tracing::debug!(last_stage = %stage, "Bootstrap sequence stopped");
            *stage = BootstrapStage::Failed;
        }
        result
    }

    async fn steps_from(
        &self,
        adapter: &dyn DriverAdapter,
        resolution: &Resolution,
        stage: &mut BootstrapStage,
    ) -> Result<BootstrapReport, BootstrapError> {
        let config = &resolution.config;
        config.validate().map_err(BootstrapError::validation)?;

        provision::create_database(adapter, &resolution.admin_dsn, &resolution.create_statement)
            .await?;
        advance(stage, BootstrapStage::Provisioned);

        let pool = pool::open_shared(config, self.slot).await?;
        advance(stage, BootstrapStage::PooledOpen);

        let schema = schema::converge(&pool, self.entities).await?;
        advance(stage, BootstrapStage::SchemaConverged);

        let seeds = seed::run_seeds(&pool, &self.steps).await?;
        advance(stage, BootstrapStage::Seeded);

        Ok(BootstrapReport {
            driver: config.driver(),
            database: config.db_name().to_string(),
            schema,
            seeds,
            stage: *stage,
        })
    }
}

fn advance(stage: &mut BootstrapStage, next: BootstrapStage) {
    tracing::info!(from = %stage, to = %next, "Bootstrap stage reached");
    *stage = next;
}
