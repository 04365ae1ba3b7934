//! In-process store for local runs and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use vgw_models::{ConfigDocument, ConfigField, DetectionStatus, ObjectId, VideoRecord};

use super::{ConfigStore, StoreConnector, StoreError, StoreResult, Stores, VideoStore};

/// Keeps everything in memory. Ids sort by creation time, so listings are
/// returned oldest first.
#[derive(Default)]
pub struct MemoryStore {
    videos: RwLock<BTreeMap<ObjectId, VideoRecord>>,
    configs: RwLock<BTreeMap<ObjectId, ConfigDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a video record.
    pub async fn put_video(&self, id: ObjectId, status: DetectionStatus) {
        self.put_record(VideoRecord::new(id, status)).await;
    }

    pub async fn put_record(&self, record: VideoRecord) {
        self.videos.write().await.insert(record.id, record);
    }

    /// Field keys of a document, in order. Empty if it does not exist.
    pub async fn field_keys(&self, config_id: &ObjectId) -> Vec<String> {
        self.configs
            .read()
            .await
            .get(config_id)
            .map(|c| c.fields.iter().map(|f| f.key.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.videos.read().await.get(id).cloned())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn list_configs(&self) -> StoreResult<Vec<ConfigDocument>> {
        Ok(self.configs.read().await.values().cloned().collect())
    }

    async fn get_config(&self, id: &ObjectId) -> StoreResult<Option<ConfigDocument>> {
        Ok(self.configs.read().await.get(id).cloned())
    }

    async fn create_config(&self, name: &str) -> StoreResult<ConfigDocument> {
        let config = ConfigDocument::new(name);
        self.configs
            .write()
            .await
            .insert(config.id, config.clone());
        Ok(config)
    }

    async fn rename_config(
        &self,
        id: &ObjectId,
        name: &str,
    ) -> StoreResult<Option<ConfigDocument>> {
        let mut configs = self.configs.write().await;
        Ok(configs.get_mut(id).map(|config| {
            config.name = name.to_string();
            config.updated_at = Utc::now();
            config.clone()
        }))
    }

    async fn delete_config(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        Ok(self.configs.write().await.remove(id).map(|c| c.id))
    }

    async fn append_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        let mut configs = self.configs.write().await;
        let Some(config) = configs.get_mut(config_id) else {
            return Ok(None);
        };
        config
            .try_append(field.clone())
            .map_err(|e| StoreError::DuplicateKey(e.0))?;
        Ok(Some(field))
    }

    async fn upsert_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        let mut configs = self.configs.write().await;
        let Some(config) = configs.get_mut(config_id) else {
            return Ok(None);
        };
        config
            .try_upsert(field.clone())
            .map_err(|e| StoreError::DuplicateKey(e.0))?;
        Ok(Some(field))
    }

    async fn delete_field(
        &self,
        config_id: &ObjectId,
        field_id: &ObjectId,
    ) -> StoreResult<Option<ObjectId>> {
        let mut configs = self.configs.write().await;
        let removed = configs
            .get_mut(config_id)
            .map(|config| config.remove_field(field_id));
        Ok(match removed {
            Some(true) => Some(*field_id),
            _ => None,
        })
    }
}

/// Hands out a shared [`MemoryStore`].
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn Stores>> {
        Ok(Arc::clone(&self.store) as Arc<dyn Stores>)
    }
}
