use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::snapshot::SnapshotStorage;
use crate::tables::Tables;

/// The local persistent store.
///
/// Cloning is cheap and every clone shares the same tables. Writers are
/// serialized by the lock; `transaction` additionally undoes every change its
/// closure made when it fails, so a multi-table write is all-or-nothing.
#[derive(Clone)]
pub struct LocalStore {
    tables: Arc<RwLock<Tables>>,
    storage: Option<Arc<SnapshotStorage>>,
}

impl LocalStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::from_tables(Tables::new())
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
            storage: None,
        }
    }

    /// Open a store backed by a snapshot file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let storage = SnapshotStorage::new(path);
        let tables = storage.load()?;
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            storage: Some(Arc::new(storage)),
        })
    }

    pub async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.read().await;
        f(&tables)
    }

    pub async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.write().await;
        f(&mut tables)
    }

    /// Run a multi-table write atomically. On `Err` every row the closure
    /// touched is restored to its state before the call.
    pub async fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut tables = self.tables.write().await;
        tables.begin();
        match f(&mut tables) {
            Ok(value) => {
                tables.commit();
                Ok(value)
            }
            Err(e) => {
                debug!("Store transaction failed, rolling back");
                tables.rollback();
                Err(e)
            }
        }
    }

    /// Write the current tables to the backing snapshot, if any.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let tables = self.tables.read().await;
        storage.save(&tables)
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }
}
