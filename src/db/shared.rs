//! Process-wide connection slot
//!
//! The pooled connection opened during bootstrap is published here so the
//! rest of the process can reach it. A slot is written at most once.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::bootstrap::BootstrapError;
use crate::db::DynDatabasePool;

/// Write-once holder for the shared database pool
pub struct ConnectionSlot {
    cell: OnceCell<DynDatabasePool>,
}

impl ConnectionSlot {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Publish `pool`. Fails if a pool was already installed.
    pub fn install(&self, pool: DynDatabasePool) -> Result<(), BootstrapError> {
        self.cell
            .set(pool)
            .map_err(|_| BootstrapError::AlreadyInitialized)
    }

    pub fn get(&self) -> Option<&DynDatabasePool> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("driver", &self.get().map(|pool| pool.driver()))
            .finish()
    }
}

static GLOBAL: ConnectionSlot = ConnectionSlot::new();

/// The slot the running process reads its database handle from
pub fn global() -> &'static ConnectionSlot {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseDriver;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_install_once() {
        let slot = ConnectionSlot::new();
        assert!(!slot.is_initialized());
        assert!(slot.get().is_none());

        slot.install(create_test_pool().await.unwrap()).unwrap();
        assert!(slot.is_initialized());
        assert_eq!(slot.get().unwrap().driver(), DatabaseDriver::Sqlite);

        let err = slot.install(create_test_pool().await.unwrap()).unwrap_err();
        assert!(matches!(err, BootstrapError::AlreadyInitialized));
    }

    #[tokio::test]
    async fn test_debug_shows_driver() {
        let slot = ConnectionSlot::default();
        assert_eq!(format!("{:?}", slot), "ConnectionSlot { driver: None }");

        slot.install(create_test_pool().await.unwrap()).unwrap();
        assert_eq!(format!("{:?}", slot), "ConnectionSlot { driver: Some(Sqlite) }");
    }
}
