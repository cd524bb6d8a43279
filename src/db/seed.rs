//! Ordered, idempotent seeding of baseline rows

use anyhow::Result;
use async_trait::async_trait;

use crate::bootstrap::BootstrapError;
use crate::db::DynDatabasePool;

/// A value bound into a seed statement
#[derive(Debug, Clone, PartialEq)]
pub enum SeedValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<&str> for SeedValue {
    fn from(value: &str) -> Self {
        SeedValue::Text(value.to_string())
    }
}

impl From<String> for SeedValue {
    fn from(value: String) -> Self {
        SeedValue::Text(value)
    }
}

impl From<i64> for SeedValue {
    fn from(value: i64) -> Self {
        SeedValue::Int(value)
    }
}

impl From<i32> for SeedValue {
    fn from(value: i32) -> Self {
        SeedValue::Int(value.into())
    }
}

impl From<bool> for SeedValue {
    fn from(value: bool) -> Self {
        SeedValue::Bool(value)
    }
}

/// One step of the seed sequence.
///
/// A step must be safe to run against a database it already seeded.
#[async_trait]
pub trait SeedStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns the number of rows inserted
    async fn run(&self, pool: &DynDatabasePool) -> Result<u64>;
}

/// A baseline row: the `key` columns identify it, `values` fill the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedRow {
    key: Vec<(&'static str, SeedValue)>,
    values: Vec<(&'static str, SeedValue)>,
}

impl SeedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, column: &'static str, value: impl Into<SeedValue>) -> Self {
        self.key.push((column, value.into()));
        self
    }

    pub fn value(mut self, column: &'static str, value: impl Into<SeedValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    fn has_explicit_id(&self) -> bool {
        self.key.iter().any(|(column, _)| *column == "id")
    }

    fn all_columns(&self) -> Vec<(&'static str, SeedValue)> {
        self.key.iter().chain(self.values.iter()).cloned().collect()
    }
}

/// Insert each row whose key is not present in `table` yet.
///
/// Rows that already exist are left as they are. When rows were inserted
/// with explicit ids the table's id sequence is realigned afterwards.
pub async fn insert_missing(pool: &DynDatabasePool, table: &str, rows: &[SeedRow]) -> Result<u64> {
    let mut inserted = 0;
    let mut explicit_ids = false;

    for row in rows {
        if pool.count_matching(table, &row.key).await? > 0 {
            tracing::debug!(table, key = ?row.key, "Seed row present, skipping");
            continue;
        }
        pool.insert_row(table, &row.all_columns()).await?;
        explicit_ids |= row.has_explicit_id();
        inserted += 1;
    }

    if explicit_ids {
        if let Some(sql) = pool.dialect().resync_sequence(table, "id") {
            pool.execute(&sql).await?;
        }
    }

    Ok(inserted)
}

/// Rows inserted per step, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub steps: Vec<(&'static str, u64)>,
}

impl SeedReport {
    pub fn rows_inserted(&self) -> u64 {
        self.steps.iter().map(|(_, rows)| rows).sum()
    }
}

/// Run `steps` in order, stopping at the first failure.
///
/// Effects of the steps that already ran are kept.
pub async fn run_seeds(
    pool: &DynDatabasePool,
    steps: &[Box<dyn SeedStep>],
) -> Result<SeedReport, BootstrapError> {
    let mut report = SeedReport::default();

    for step in steps {
        let rows = step.run(pool).await.map_err(|source| BootstrapError::Seed {
            step: step.name().to_string(),
            source,
        })?;
        tracing::debug!(step = step.name(), rows, "Seed step finished");
        report.steps.push((step.name(), rows));
    }

    tracing::info!(
        steps = report.steps.len(),
        rows = report.rows_inserted(),
        "Baseline data seeded"
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Step that records whether it ran and optionally fails
    pub(crate) struct SpyStep {
        pub name: &'static str,
        pub fail: bool,
        pub calls: Arc<AtomicUsize>,
    }

    impl SpyStep {
        pub(crate) fn new(name: &'static str, fail: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    fail,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl SeedStep for SpyStep {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, pool: &DynDatabasePool) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("{} refused to run", self.name);
            }
            pool.execute("CREATE TABLE IF NOT EXISTS spy_log (step TEXT)")
                .await?;
            insert_missing(pool, "spy_log", &[SeedRow::new().key("step", self.name)]).await
        }
    }

    async fn pool_with_roles() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.execute(
            "CREATE TABLE roles (id INTEGER PRIMARY KEY AUTOINCREMENT, code TEXT, label TEXT, builtin BOOLEAN)",
        )
        .await
        .unwrap();
        pool
    }

    fn roles() -> Vec<SeedRow> {
        vec![
            SeedRow::new()
                .key("code", "admin")
                .value("label", "Administrator")
                .value("builtin", true),
            SeedRow::new()
                .key("code", "guest")
                .value("label", "Guest")
                .value("builtin", false),
        ]
    }

    #[tokio::test]
    async fn test_insert_missing_skips_existing_rows() {
        let pool = pool_with_roles().await;

        assert_eq!(insert_missing(&pool, "roles", &roles()).await.unwrap(), 2);
        assert_eq!(insert_missing(&pool, "roles", &roles()).await.unwrap(), 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM roles")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_insert_missing_leaves_edited_rows_alone() {
        let pool = pool_with_roles().await;
        insert_missing(&pool, "roles", &roles()).await.unwrap();
        pool.execute("UPDATE roles SET label = 'Root' WHERE code = 'admin'")
            .await
            .unwrap();

        insert_missing(&pool, "roles", &roles()).await.unwrap();

        let label: String = sqlx::query_scalar("SELECT label FROM roles WHERE code = 'admin'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(label, "Root");
    }

    #[tokio::test]
    async fn test_explicit_ids_are_kept() {
        let pool = pool_with_roles().await;
        let rows = vec![SeedRow::new().key("id", 40).value("code", "ops")];

        insert_missing(&pool, "roles", &rows).await.unwrap();
        pool.execute("INSERT INTO roles (code) VALUES ('next')")
            .await
            .unwrap();

        let id: i64 = sqlx::query_scalar("SELECT id FROM roles WHERE code = 'next'")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(id, 41);
    }

    #[tokio::test]
    async fn test_run_seeds_halts_at_first_failure() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let (first, first_calls) = SpyStep::new("first", false);
        let (broken, broken_calls) = SpyStep::new("broken", true);
        let (after, after_calls) = SpyStep::new("after", false);
        let steps: Vec<Box<dyn SeedStep>> = vec![Box::new(first), Box::new(broken), Box::new(after)];

        let err = run_seeds(&pool, &steps).await.unwrap_err();

        match err {
            BootstrapError::Seed { step, source } => {
                assert_eq!(step, "broken");
                assert_eq!(source.to_string(), "broken refused to run");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(broken_calls.load(Ordering::SeqCst), 1);
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);

        // The step before the failure is not rolled back
        let logged: Vec<String> = sqlx::query_scalar("SELECT step FROM spy_log")
            .fetch_all(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(logged, vec!["first"]);
    }

    #[tokio::test]
    async fn test_run_seeds_reports_in_order() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        let (a, _) = SpyStep::new("a", false);
        let (b, _) = SpyStep::new("b", false);
        let steps: Vec<Box<dyn SeedStep>> = vec![Box::new(a), Box::new(b)];

        let report = run_seeds(&pool, &steps).await.unwrap();
        assert_eq!(report.steps, vec![("a", 1), ("b", 1)]);

        let again = run_seeds(&pool, &steps).await.unwrap();
        assert_eq!(again.rows_inserted(), 0);
    }
}
