//! Bootstrap error taxonomy
//!
//! Messages are shown to the administrator who started the bootstrap, so
//! they name the engine, entity or step involved. DSNs are masked.

use crate::config::{ConfigError, DatabaseDriver};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Cannot reach {driver} server at {target}: {source}")]
    Connectivity {
        driver: DatabaseDriver,
        target: String,
        source: sqlx::Error,
    },

    #[error("Failed to create {driver} database with `{statement}`: {source}")]
    Provisioning {
        driver: DatabaseDriver,
        statement: String,
        source: sqlx::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("Failed to converge schema for '{entity}': {source:#}")]
    Convergence {
        entity: String,
        source: anyhow::Error,
    },

    #[error("Seed step '{step}' failed: {source:#}")]
    Seed {
        step: String,
        source: anyhow::Error,
    },

    #[error("Failed to persist configuration: {0}")]
    Persistence(#[from] ConfigError),

    #[error("Database is already initialized")]
    AlreadyInitialized,
}

impl BootstrapError {
    /// Map a failed [`ResolvedConfig::validate`](crate::config::ResolvedConfig::validate).
    pub fn validation(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationError(message) => BootstrapError::ConfigValidation(message),
            other => BootstrapError::ConfigValidation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = BootstrapError::Seed {
            step: "casbin_rules".to_string(),
            source: anyhow::anyhow!("no such table").context("Failed to insert into casbin_rule"),
        };
        assert_eq!(
            err.to_string(),
            "Seed step 'casbin_rules' failed: Failed to insert into casbin_rule: no such table"
        );

        let err = BootstrapError::ConfigValidation("database name must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: database name must not be empty"
        );
    }

    #[test]
    fn test_config_errors_convert_to_persistence() {
        let err: BootstrapError = ConfigError::SerializeError("bad".to_string()).into();
        assert!(matches!(err, BootstrapError::Persistence(_)));
    }
}
