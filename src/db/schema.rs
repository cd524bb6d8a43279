//! Additive schema convergence
//!
//! Entities are described with [`EntityDescriptor`] values built from
//! `const fn` builders, so the application's catalog can live in statics.
//! [`converge`] walks the descriptors in order and only ever creates:
//! missing tables, missing columns on existing tables, and missing indexes.
//! Nothing is dropped, renamed or retyped.

use anyhow::Result;

use crate::bootstrap::BootstrapError;
use crate::db::dialect::Dialect;
use crate::db::DynDatabasePool;

/// Portable column types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Autoincrement 64-bit primary key
    Id,
    BigInt,
    Int,
    Bool,
    Varchar(u16),
    Text,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnDefault {
    Int(i64),
    Bool(bool),
    Text(&'static str),
    CurrentTimestamp,
}

/// A column declaration. Columns are nullable unless marked `not_null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    /// `(table, column)` this column points at
    pub references: Option<(&'static str, &'static str)>,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            default: None,
            references: None,
        }
    }

    pub const fn id() -> Self {
        Self::new("id", ColumnType::Id)
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl Index {
    pub const fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: false,
        }
    }

    pub const fn unique(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            unique: true,
        }
    }
}

/// Declared structure of one relation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub columns: &'static [Column],
    /// Table-level primary key, for relations without an `id` column
    pub primary_key: &'static [&'static str],
    pub indexes: &'static [Index],
}

impl EntityDescriptor {
    pub const fn new(table: &'static str, columns: &'static [Column]) -> Self {
        Self {
            table,
            columns,
            primary_key: &[],
            indexes: &[],
        }
    }

    pub const fn primary_key(mut self, columns: &'static [&'static str]) -> Self {
        self.primary_key = columns;
        self
    }

    pub const fn indexes(mut self, indexes: &'static [Index]) -> Self {
        self.indexes = indexes;
        self
    }

    fn declares(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(column))
    }

    /// Primary key and index columns must all be declared columns.
    pub fn check_key_columns(&self) -> Result<()> {
        if let Some(column) = self.primary_key.iter().find(|c| !self.declares(c)) {
            anyhow::bail!("primary key column {} is not declared on {}", column, self.table);
        }
        for index in self.indexes {
            if let Some(column) = index.columns.iter().find(|c| !self.declares(c)) {
                anyhow::bail!(
                    "index {} uses column {} which is not declared on {}",
                    index.name,
                    column,
                    self.table
                );
            }
        }
        Ok(())
    }
}

/// What a convergence run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Tables created, in creation order
    pub tables_created: Vec<&'static str>,
    pub columns_added: usize,
    pub indexes_created: usize,
}

impl ConvergeReport {
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty() && self.columns_added == 0 && self.indexes_created == 0
    }
}

/// Bring every entity up to its declared structure, in the given order.
///
/// The first failure aborts the run. Entities converged before it stay
/// converged.
pub async fn converge(
    pool: &DynDatabasePool,
    entities: &[EntityDescriptor],
) -> Result<ConvergeReport, BootstrapError> {
    let mut report = ConvergeReport::default();

    for entity in entities {
        converge_entity(pool, entity, &mut report)
            .await
            .map_err(|source| BootstrapError::Convergence {
                entity: entity.table.to_string(),
                source,
            })?;
    }

    if report.is_noop() {
        tracing::debug!(entities = entities.len(), "Schema already up to date");
    } else {
        tracing::info!(
            entities = entities.len(),
            tables_created = report.tables_created.len(),
            columns_added = report.columns_added,
            indexes_created = report.indexes_created,
            "Schema converged"
        );
    }

    Ok(report)
}

async fn converge_entity(
    pool: &DynDatabasePool,
    entity: &EntityDescriptor,
    report: &mut ConvergeReport,
) -> Result<()> {
    entity.check_key_columns()?;

    let dialect = pool.dialect();
    let existing = pool.table_columns(entity.table).await?;

    if existing.is_empty() {
        let sql = create_table_sql(dialect, entity, pool.foreign_key_constraints());
        tracing::debug!(table = entity.table, "Creating table");
        pool.execute(&sql).await?;
        report.tables_created.push(entity.table);
    } else {
        for column in entity.columns {
            if existing.iter().any(|c| c.eq_ignore_ascii_case(column.name)) {
                continue;
            }
            tracing::debug!(table = entity.table, column = column.name, "Adding column");
            pool.execute(&add_column_sql(dialect, entity.table, column))
                .await?;
            report.columns_added += 1;
        }
    }

    for index in entity.indexes {
        if pool.index_exists(entity.table, index.name).await? {
            continue;
        }
        tracing::debug!(table = entity.table, index = index.name, "Creating index");
        pool.execute(&create_index_sql(dialect, entity.table, index))
            .await?;
        report.indexes_created += 1;
    }

    Ok(())
}

pub fn column_definition(dialect: &dyn Dialect, column: &Column) -> String {
    let mut definition = format!(
        "{} {}",
        dialect.quote_ident(column.name),
        dialect.column_type(column.kind)
    );

    // The key type already carries its constraints
    if column.kind == ColumnType::Id {
        return definition;
    }

    if !column.nullable {
        definition.push_str(" NOT NULL");
    }
    if let Some(default) = column.default {
        definition.push_str(" DEFAULT ");
        definition.push_str(&dialect.default_literal(default));
    }
    definition
}

pub fn create_table_sql(
    dialect: &dyn Dialect,
    entity: &EntityDescriptor,
    foreign_keys: bool,
) -> String {
    let mut parts: Vec<String> = entity
        .columns
        .iter()
        .map(|column| column_definition(dialect, column))
        .collect();

    if !entity.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", quote_list(dialect, entity.primary_key)));
    }

    if foreign_keys {
        for column in entity.columns {
            if let Some((table, target)) = column.references {
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    dialect.quote_ident(column.name),
                    dialect.quote_ident(table),
                    dialect.quote_ident(target)
                ));
            }
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n){}",
        dialect.quote_ident(entity.table),
        parts.join(",\n    "),
        dialect.table_options()
    )
}

pub fn add_column_sql(dialect: &dyn Dialect, table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        dialect.quote_ident(table),
        column_definition(dialect, column)
    )
}

pub fn create_index_sql(dialect: &dyn Dialect, table: &str, index: &Index) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        dialect.quote_ident(index.name),
        dialect.quote_ident(table),
        quote_list(dialect, index.columns)
    )
}

fn quote_list(dialect: &dyn Dialect, idents: &[&str]) -> String {
    idents
        .iter()
        .map(|ident| dialect.quote_ident(ident))
        .collect::<Vec<_>>()
        .join(", ")
}
