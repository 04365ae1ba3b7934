//! Firestore-backed stores.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use vgw_firestore::{
    ConfigRepository, FirestoreClient, FirestoreConfig, FirestoreError, VideoRepository,
};
use vgw_models::{ConfigDocument, ConfigField, ObjectId, StatusRegistry, VideoRecord};

use super::{ConfigStore, StoreConnector, StoreError, StoreResult, Stores, VideoStore};

pub struct FirestoreStores {
    videos: VideoRepository,
    configs: ConfigRepository,
}

impl FirestoreStores {
    pub fn new(
        client: FirestoreClient,
        videos_collection: &str,
        configs_collection: &str,
        registry: Arc<StatusRegistry>,
    ) -> Self {
        Self {
            videos: VideoRepository::new(client.clone(), videos_collection, registry),
            configs: ConfigRepository::new(client, configs_collection),
        }
    }
}

/// Uniqueness violations carry the rejected key.
fn field_error(err: FirestoreError, key: &str) -> StoreError {
    match err {
        FirestoreError::ConstraintViolation(_) => StoreError::DuplicateKey(key.to_string()),
        other => other.into(),
    }
}

#[async_trait]
impl VideoStore for FirestoreStores {
    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>> {
        Ok(self.videos.get(id).await?)
    }
}

#[async_trait]
impl ConfigStore for FirestoreStores {
    async fn list_configs(&self) -> StoreResult<Vec<ConfigDocument>> {
        Ok(self.configs.list().await?)
    }

    async fn get_config(&self, id: &ObjectId) -> StoreResult<Option<ConfigDocument>> {
        Ok(self.configs.get(id).await?)
    }

    async fn create_config(&self, name: &str) -> StoreResult<ConfigDocument> {
        Ok(self.configs.create(name).await?)
    }

    async fn rename_config(
        &self,
        id: &ObjectId,
        name: &str,
    ) -> StoreResult<Option<ConfigDocument>> {
        Ok(self.configs.update_name(id, name).await?)
    }

    async fn delete_config(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>> {
        Ok(self.configs.delete(id).await?)
    }

    async fn append_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        let key = field.key.clone();
        self.configs
            .append_field(config_id, field)
            .await
            .map_err(|e| field_error(e, &key))
    }

    async fn upsert_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>> {
        let key = field.key.clone();
        self.configs
            .upsert_field(config_id, field)
            .await
            .map_err(|e| field_error(e, &key))
    }

    async fn delete_field(
        &self,
        config_id: &ObjectId,
        field_id: &ObjectId,
    ) -> StoreResult<Option<ObjectId>> {
        Ok(self.configs.delete_field(config_id, field_id).await?)
    }
}

/// Connects to Firestore using [`FirestoreConfig::from_env`].
pub struct FirestoreConnector {
    pub videos_collection: String,
    pub configs_collection: String,
    pub registry: Arc<StatusRegistry>,
}

#[async_trait]
impl StoreConnector for FirestoreConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn Stores>> {
        let config =
            FirestoreConfig::from_env().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!(
            project_id = %config.project_id,
            database_id = %config.database_id,
            "Connecting to Firestore"
        );
        let client = FirestoreClient::new(config)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Arc::new(FirestoreStores::new(
            client,
            &self.videos_collection,
            &self.configs_collection,
            Arc::clone(&self.registry),
        )))
    }
}
