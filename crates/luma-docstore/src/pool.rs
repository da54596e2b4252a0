//! Bounded pool of store handles
//!
//! The store client is shared, the pool only bounds how many statements hold
//! it at once. A handle is returned to the pool when the [`PooledStore`]
//! guard drops.

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::store::DocumentStore;
use crate::{DocStoreError, Result};

#[derive(Clone)]
pub struct StorePool {
    store: Arc<dyn DocumentStore>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl StorePool {
    pub fn new(store: Arc<dyn DocumentStore>, max_size: usize) -> Self {
        let size = max_size.max(1);
        Self {
            store,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Wait for a free handle.
    pub async fn acquire(&self) -> Result<PooledStore> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DocStoreError::PoolClosed)?;
        trace!("store handle acquired, {} left", self.permits.available_permits());
        Ok(PooledStore {
            store: self.store.clone(),
            _permit: permit,
        })
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Refuse further acquisitions; handles already out stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

pub struct PooledStore {
    store: Arc<dyn DocumentStore>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledStore {
    type Target = dyn DocumentStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}

impl Drop for PooledStore {
    fn drop(&mut self) {
        trace!("store handle released");
    }
}
