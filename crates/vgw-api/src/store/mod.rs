//! Storage seams used by the handlers and the detection gate.

mod firestore;
mod handle;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

use vgw_firestore::FirestoreError;
use vgw_models::{ConfigDocument, ConfigField, ObjectId, VideoRecord};

pub use firestore::{FirestoreConnector, FirestoreStores};
pub use handle::{StoreConnector, StoreHandle};
pub use memory::{MemoryConnector, MemoryStore};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Another field of the document already uses this key.
    #[error("duplicated field key: {0}")]
    DuplicateKey(String),

    /// The store handle was shut down.
    #[error("store is closed")]
    Closed,

    /// The store could not be reached or initialized.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Firestore(#[from] FirestoreError),
}

impl StoreError {
    /// Client-facing message for [`StoreError::DuplicateKey`].
    pub const DUPLICATED_FIELD: &'static str = "Duplicated field";
}

/// Read access to video records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn find_video(&self, id: &ObjectId) -> StoreResult<Option<VideoRecord>>;
}

/// Configuration documents and their fields.
///
/// Field keys are unique within a document. Mutations that would break that
/// fail with [`StoreError::DuplicateKey`] and leave the document unchanged.
/// Operations on a missing document return `Ok(None)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn list_configs(&self) -> StoreResult<Vec<ConfigDocument>>;

    async fn get_config(&self, id: &ObjectId) -> StoreResult<Option<ConfigDocument>>;

    async fn create_config(&self, name: &str) -> StoreResult<ConfigDocument>;

    async fn rename_config(&self, id: &ObjectId, name: &str)
        -> StoreResult<Option<ConfigDocument>>;

    async fn delete_config(&self, id: &ObjectId) -> StoreResult<Option<ObjectId>>;

    async fn append_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>>;

    /// Replace the field with the same id or append it.
    async fn upsert_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> StoreResult<Option<ConfigField>>;

    async fn delete_field(
        &self,
        config_id: &ObjectId,
        field_id: &ObjectId,
    ) -> StoreResult<Option<ObjectId>>;
}

/// A backend providing both stores.
pub trait Stores: VideoStore + ConfigStore {}

impl<T: VideoStore + ConfigStore> Stores for T {}
