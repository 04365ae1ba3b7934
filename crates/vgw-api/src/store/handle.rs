//! Process-wide store handle with lazy initialization and explicit shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use vgw_models::{ConfigDocument, ConfigField, ObjectId, VideoRecord};

use super::{ConfigStore, StoreError, StoreResult, Stores, VideoStore};

/// Opens a store backend.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> StoreResult<Arc<dyn Stores>>;
}

/// Connects on first use. Concurrent first calls share one connection
/// attempt; a failed attempt is retried by the next caller.
///
/// After [`shutdown`](Self::shutdown) every access fails with
/// [`StoreError::Closed`].
pub struct StoreHandle {
    connector: Box<dyn StoreConnector>,
    stores: OnceCell<Arc<dyn Stores>>,
    closed: AtomicBool,
}

impl StoreHandle {
    pub fn new(connector: impl StoreConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            stores: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Backend, connecting if needed.
    pub async fn get(&self) -> StoreResult<Arc<dyn Stores>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        let stores = self
            .stores
            .get_or_try_init(|| async {
                let stores = self.connector.connect().await?;
                info!("Store connection initialized");
                Ok::<_, StoreError>(stores)
            })
            .await?;

        Ok(Arc::clone(stores))
    }

    pub fn is_initialized(&self) -> bool {
        self.stores.initialized()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Refuse further access. Idempotent.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(initialized = self.is_initialized(), "Store handle shut down");
        }
    }
}

#[async_trait]
impl VideoStore for StoreHandle {
    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>> {
        self.get().await?.find_video(id).await
    }
}

#[async_trait]
impl ConfigStore for StoreHandle {
    async fn list_configs(&self) -> StoreResult<Vec<ConfigDocument>> {
        self.get().await?.list_configs().await
    }

    async fn get_config(&self, id: &ObjectId) -> StoreResult<Option<ConfigDocument>> {
        self.get().await?.get_config(id).await
    }

    async fn create_config(&self, name: &str) -> StoreResult<ConfigDocument> {
        self.get().await?.create_config(name).await
    }

    async fn rename_config(
        &self,
        id: &ObjectId,
        name: &str,
    ) -> StoreResult<Option<ConfigDocument>> {
        self.get().await?.rename_config(id, name).await
    }

    async fn delete_config(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        self.get().await?.delete_config(id).await
    }

    async fn append_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        self.get().await?.append_field(config_id, field).await
    }

    async fn upsert_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        self.get().await?.upsert_field(config_id, field).await
    }

    async fn delete_field(
        &self,
        config_id: &ObjectId,
        field_id: &ObjectId,
    ) -> StoreResult<Option<ObjectId>> {
        self.get().await?.delete_field(config_id, field_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::AtomicU32;
    use vgw_models::DetectionStatus;

    struct CountingConnector {
        calls: Arc<AtomicU32>,
        store: Arc<MemoryStore>,
    }

    #[async_trait]
    impl StoreConnector for CountingConnector {
        async fn connect(&self) -> StoreResult<Arc<dyn Stores>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::clone(&self.store) as Arc<dyn Stores>)
        }
    }

    struct FailingConnector;

    #[async_trait]
    impl StoreConnector for FailingConnector {
        async fn connect(&self) -> StoreResult<Arc<dyn Stores>> {
            Err(StoreError::Unavailable("no credentials".to_string()))
        }
    }

    fn counting() -> (StoreHandle, Arc<AtomicU32>, Arc<MemoryStore>) {
        let calls = Arc::new(AtomicU32::new(0));
        let store = Arc::new(MemoryStore::new());
        let handle = StoreHandle::new(CountingConnector {
            calls: Arc::clone(&calls),
            store: Arc::clone(&store),
        });
        (handle, calls, store)
    }

    #[tokio::test]
    async fn test_connects_lazily_once() {
        let (handle, calls, store) = counting();
        assert!(!handle.is_initialized());

        let id = ObjectId::new();
        store.put_video(id, DetectionStatus::Started).await;

        let (a, b) = tokio::join!(handle.find_video(&id), handle.find_video(&id));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_shutdown_closes_handle() {
        let (handle, _, _) = counting();
        handle.list_configs().await.unwrap();

        handle.shutdown();
        handle.shutdown();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.list_configs().await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_failed_connect_is_reported_and_not_cached() {
        let handle = StoreHandle::new(FailingConnector);
        assert!(matches!(
            handle.get().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!handle.is_initialized());
    }
}
