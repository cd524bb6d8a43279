//! Process-wide configuration state and its durable file.
//!
//! The store owns the in-memory [`Config`] the rest of the process reads and
//! knows where the YAML document lives on disk. Persisting always rewrites the
//! whole document: every top-level section of the in-memory configuration is
//! written, not only the one that changed. Top-level keys this crate does not
//! model are carried over from the existing file.
//!
//! Callers must not persist concurrently; the last writer wins.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_yaml::{Mapping, Value};

use super::{Config, ConfigError, ResolvedConfig};

/// Process-wide configuration object backed by a YAML file
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
        }
    }

    /// Load the file at `path` (with environment overrides) into a new store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let config = Config::load_with_env(&path)?;
        Ok(Self::new(path, config))
    }

    /// Copy of the current in-memory configuration
    pub fn snapshot(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether the authoritative section still lacks a database name
    pub fn needs_init(&self) -> bool {
        self.snapshot().active_connection().validate().is_err()
    }

    /// Store `resolved` as the active section and write the full document.
    ///
    /// The in-memory update happens first and is kept even when the write
    /// fails.
    pub fn persist(&self, resolved: &ResolvedConfig) -> Result<(), ConfigError> {
        let flattened = {
            let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
            config.apply(resolved);
            flatten(&config)?
        };

        write_document(&self.path, flattened)?;

        tracing::info!(
            path = %self.path.display(),
            db_type = %resolved.driver(),
            "Configuration written"
        );
        Ok(())
    }
}

/// Turn the configuration into a generic top-level key/value mapping.
fn flatten(config: &Config) -> Result<Mapping, ConfigError> {
    match serde_yaml::to_value(config) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(other) => Err(ConfigError::SerializeError(format!(
            "expected a mapping, got {:?}",
            other
        ))),
        Err(e) => Err(ConfigError::SerializeError(e.to_string())),
    }
}

/// Overlay `flattened` on the existing document and replace the file.
fn write_document(path: &Path, flattened: Mapping) -> Result<(), ConfigError> {
    let mut document = read_existing(path);
    for (key, value) in flattened {
        document.insert(key, value);
    }

    let content = serde_yaml::to_string(&Value::Mapping(document))
        .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    let write_err = |source: std::io::Error| ConfigError::FileWrite {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Write next to the target and rename so readers never see a torn file
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// The current document, or an empty mapping when the file is missing or
/// unreadable.
fn read_existing(path: &Path) -> Mapping {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Mapping::new();
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(_) => Mapping::new(),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Existing config file is not valid YAML, rewriting it from scratch"
            );
            Mapping::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseDriver, MysqlConfig, PgsqlConfig};

    fn mysql(db_name: &str) -> ResolvedConfig {
        ResolvedConfig::Mysql(MysqlConfig {
            db_name: db_name.to_string(),
            password: "x".to_string(),
            ..MysqlConfig::default()
        })
    }

    #[test]
    fn test_persist_writes_active_section_and_selector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let store = ConfigStore::new(&path, Config::default());

        let resolved = ResolvedConfig::Postgres(PgsqlConfig {
            db_name: "console".to_string(),
            ..PgsqlConfig::default()
        });
        store.persist(&resolved).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.system.db_type, DatabaseDriver::Postgres);
        assert_eq!(reloaded.active_connection(), resolved);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("db-type: postgres"));
        assert!(raw.contains("db-name: console"));
        // Whole document, not only the changed section
        assert!(raw.contains("mysql:"));
        assert!(raw.contains("sqlite:"));
    }

    #[test]
    fn test_persist_keeps_unmodelled_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "jwt:\n  signing-key: abc\nsystem:\n  addr: 9000\n").unwrap();

        let store = ConfigStore::open(&path).unwrap();
        store.persist(&mysql("app")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("signing-key: abc"));

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.system.addr, 9000);
        assert_eq!(reloaded.mysql.db_name, "app");
    }

    #[test]
    fn test_persist_failure_keeps_in_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by the rename
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        let store = ConfigStore::new(&path, Config::default());

        let err = store.persist(&mysql("app")).unwrap_err();
        assert!(matches!(err, ConfigError::FileWrite { .. }));

        let config = store.snapshot();
        assert_eq!(config.mysql.db_name, "app");
        assert!(!store.needs_init());
    }

    #[test]
    fn test_needs_init_follows_active_section() {
        let mut config = Config::default();
        let store = ConfigStore::new("unused.yaml", config.clone());
        assert!(store.needs_init());

        config.system.db_type = DatabaseDriver::Sqlite;
        config.mysql.db_name = "app".to_string();
        let store = ConfigStore::new("unused.yaml", config);
        assert!(store.needs_init());
    }
}
