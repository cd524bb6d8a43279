//! SQL dialect differences between the supported engines
//!
//! Everything that renders SQL text goes through a [`Dialect`], so the
//! schema and seed code never branches on the driver itself.

use crate::db::schema::{ColumnDefault, ColumnType};

/// Per-engine SQL rendering rules
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quote an identifier, escaping embedded quote characters.
    fn quote_ident(&self, ident: &str) -> String;

    /// Bind placeholder for the 1-based parameter `index`
    fn placeholder(&self, index: usize) -> String;

    fn column_type(&self, kind: ColumnType) -> String;

    fn bool_literal(&self, value: bool) -> &'static str;

    /// Appended after the closing parenthesis of `CREATE TABLE`
    fn table_options(&self) -> &'static str {
        ""
    }

    /// Idempotent view creation
    fn create_view(&self, name: &str, select: &str) -> String;

    /// Statement realigning an autoincrement sequence after rows were
    /// inserted with explicit ids.
    fn resync_sequence(&self, _table: &str, _column: &str) -> Option<String> {
        None
    }

    fn default_literal(&self, default: ColumnDefault) -> String {
        match default {
            ColumnDefault::Int(value) => value.to_string(),
            ColumnDefault::Bool(value) => self.bool_literal(value).to_string(),
            ColumnDefault::Text(value) => format!("'{}'", value.replace('\'', "''")),
            ColumnDefault::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, kind: ColumnType) -> String {
        match kind {
            ColumnType::Id => "BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Int => "INT".to_string(),
            ColumnType::Bool => "TINYINT(1)".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Text => "LONGTEXT".to_string(),
            ColumnType::Timestamp => "DATETIME".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn table_options(&self) -> &'static str {
        " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_general_ci"
    }

    fn create_view(&self, name: &str, select: &str) -> String {
        format!("CREATE OR REPLACE VIEW {} AS {}", self.quote_ident(name), select)
    }
}

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn column_type(&self, kind: ColumnType) -> String {
        match kind {
            ColumnType::Id => "BIGSERIAL PRIMARY KEY".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Int => "INTEGER".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Timestamp => "TIMESTAMPTZ".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn create_view(&self, name: &str, select: &str) -> String {
        format!("CREATE OR REPLACE VIEW {} AS {}", self.quote_ident(name), select)
    }

    fn resync_sequence(&self, table: &str, column: &str) -> Option<String> {
        Some(format!(
            "SELECT setval(pg_get_serial_sequence('{table}', '{column}'), \
             COALESCE((SELECT MAX({col}) FROM {tbl}), 1))",
            table = table.replace('\'', "''"),
            column = column.replace('\'', "''"),
            col = self.quote_ident(column),
            tbl = self.quote_ident(table),
        ))
    }
}

pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    // Double quotes fall back to a string literal for unknown names
    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn column_type(&self, kind: ColumnType) -> String {
        match kind {
            ColumnType::Id => "INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            ColumnType::BigInt | ColumnType::Int => "INTEGER".to_string(),
            ColumnType::Bool => "BOOLEAN".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::Timestamp => "DATETIME".to_string(),
        }
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn create_view(&self, name: &str, select: &str) -> String {
        format!("CREATE VIEW IF NOT EXISTS {} AS {}", self.quote_ident(name), select)
    }
}

pub static MYSQL: MysqlDialect = MysqlDialect;
pub static POSTGRES: PostgresDialect = PostgresDialect;
pub static SQLITE: SqliteDialect = SqliteDialect;

/// `SELECT COUNT(*)` over rows matching every column in `columns`
pub fn count_matching_sql(dialect: &dyn Dialect, table: &str, columns: &[&str]) -> String {
    let filter = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = {}", dialect.quote_ident(column), dialect.placeholder(i + 1)))
        .collect::<Vec<_>>()
        .join(" AND ");

    if filter.is_empty() {
        format!("SELECT COUNT(*) FROM {}", dialect.quote_ident(table))
    } else {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            dialect.quote_ident(table),
            filter
        )
    }
}

pub fn insert_sql(dialect: &dyn Dialect, table: &str, columns: &[&str]) -> String {
    let names = columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let values = (1..=columns.len())
        .map(|i| dialect.placeholder(i))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(table),
        names,
        values
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(MYSQL.quote_ident("desc"), "`desc`");
        assert_eq!(MYSQL.quote_ident("we`ird"), "`we``ird`");
        assert_eq!(POSTGRES.quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(SQLITE.quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_placeholders() {
        let sql = count_matching_sql(&POSTGRES, "sys_apis", &["path", "method"]);
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM \"sys_apis\" WHERE \"path\" = $1 AND \"method\" = $2"
        );

        let sql = insert_sql(&MYSQL, "sys_apis", &["path", "method"]);
        assert_eq!(sql, "INSERT INTO `sys_apis` (`path`, `method`) VALUES (?, ?)");
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(POSTGRES.default_literal(ColumnDefault::Bool(false)), "FALSE");
        assert_eq!(MYSQL.default_literal(ColumnDefault::Bool(true)), "1");
        assert_eq!(SQLITE.default_literal(ColumnDefault::Text("it's")), "'it''s'");
    }

    #[test]
    fn test_only_postgres_resyncs_sequences() {
        assert!(MYSQL.resync_sequence("sys_base_menus", "id").is_none());
        assert!(SQLITE.resync_sequence("sys_base_menus", "id").is_none());
        let sql = POSTGRES.resync_sequence("sys_base_menus", "id").unwrap();
        assert!(sql.contains("pg_get_serial_sequence('sys_base_menus', 'id')"));
    }
}
