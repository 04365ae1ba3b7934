//! Typed repositories for video records and configuration documents.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vgw_models::{
    ConfigDocument, ConfigField, DuplicateKey, ObjectId, StatusRegistry,
    VideoRecord, DETECTION_STATUS_FIELD,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_write_conflict;
use crate::types::{Document, FromFirestoreValue, Precondition, ToFirestoreValue, Value};

/// Default collection holding video records.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Default collection holding configuration documents.
pub const CONFIG_SETS_COLLECTION: &str = "config_sets";

/// Attempts for a read-check-write cycle before giving up.
const MAX_WRITE_ATTEMPTS: u32 = 5;

const LIST_PAGE_SIZE: u32 = 300;

// =============================================================================
// Videos
// =============================================================================

/// Read-only access to video records.
#[derive(Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
    collection: String,
    registry: Arc<StatusRegistry>,
}

impl VideoRepository {
    pub fn new(
        client: FirestoreClient,
        collection: impl Into<String>,
        registry: Arc<StatusRegistry>,
    ) -> Self {
        Self {
            client,
            collection: collection.into(),
            registry,
        }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &ObjectId) -> FirestoreResult<Option<VideoRecord>> {
        let doc = self
            .client
            .get_document(&self.collection, &video_id.to_hex())
            .await?;

        doc.map(|d| document_to_video(&d, video_id, &self.registry))
            .transpose()
    }
}

/// Decode a video document.
///
/// An absent or null status field leaves the record without a status.
pub fn document_to_video(
    doc: &Document,
    video_id: &ObjectId,
    registry: &StatusRegistry,
) -> FirestoreResult<VideoRecord> {
    let status = match doc.field(DETECTION_STATUS_FIELD) {
        None | Some(Value::NullValue(())) => None,
        Some(Value::IntegerValue(code)) | Some(Value::StringValue(code)) => {
            let status = registry.decode(code).ok_or_else(|| {
                FirestoreError::invalid_response(format!(
                    "video {} has unknown {} code {:?}",
                    video_id, DETECTION_STATUS_FIELD, code
                ))
            })?;
            Some(status)
        }
        Some(other) => {
            return Err(FirestoreError::invalid_response(format!(
                "video {} has non-scalar {}: {:?}",
                video_id, DETECTION_STATUS_FIELD, other
            )))
        }
    };

    Ok(VideoRecord {
        id: *video_id,
        detection_status: status,
    })
}

// =============================================================================
// Configuration documents
// =============================================================================

/// CRUD over configuration documents.
///
/// Field-key uniqueness is enforced with a read-check-write cycle guarded by
/// the document's `updateTime`.
#[derive(Clone)]
pub struct ConfigRepository {
    client: FirestoreClient,
    collection: String,
}

impl ConfigRepository {
    pub fn new(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    pub async fn list(&self) -> FirestoreResult<Vec<ConfigDocument>> {
        let docs = self
            .client
            .list_all_documents(&self.collection, LIST_PAGE_SIZE)
            .await?;

        docs.iter()
            .map(|d| {
                let id = d
                    .id()
                    .and_then(|s| ObjectId::parse(s).ok())
                    .ok_or_else(|| {
                        FirestoreError::invalid_response(format!(
                            "config document has unexpected name {:?}",
                            d.name
                        ))
                    })?;
                document_to_config(d, &id)
            })
            .collect()
    }

    pub async fn get(&self, id: &ObjectId) -> FirestoreResult<Option<ConfigDocument>> {
        let doc = self.client.get_document(&self.collection, &id.to_hex()).await?;
        doc.map(|d| document_to_config(&d, id)).transpose()
    }

    pub async fn create(&self, name: &str) -> FirestoreResult<ConfigDocument> {
        let config = ConfigDocument::new(name);
        let written = self
            .client
            .create_document(&self.collection, &config.id.to_hex(), config_to_fields(&config))
            .await?;
        info!("Created config document: {}", config.id);
        document_to_config(&written, &config.id)
    }

    /// Rename a document. `None` if it does not exist.
    pub async fn update_name(
        &self,
        id: &ObjectId,
        name: &str,
    ) -> FirestoreResult<Option<ConfigDocument>> {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), name.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

        let result = self
            .client
            .update_document(
                &self.collection,
                &id.to_hex(),
                fields,
                Some(vec!["name".to_string(), "updated_at".to_string()]),
                Some(Precondition::exists()),
            )
            .await;

        match result {
            Ok(doc) => document_to_config(&doc, id).map(Some),
            Err(FirestoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete a document. Returns its id if it existed.
    pub async fn delete(&self, id: &ObjectId) -> FirestoreResult<Option<ObjectId>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }
        self.client.delete_document(&self.collection, &id.to_hex()).await?;
        info!("Deleted config document: {}", id);
        Ok(Some(*id))
    }

    /// Append a field. `None` if the document does not exist.
    ///
    /// Fails with [`FirestoreError::ConstraintViolation`] when the key is taken.
    pub async fn append_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> FirestoreResult<Option<ConfigField>> {
        let outcome = self
            .modify(config_id, |doc| doc.try_append(field.clone()).map(|_| true))
            .await?;
        Ok(outcome.map(|_| field))
    }

    /// Replace the field with the same id, or append it.
    ///
    /// Fails with [`FirestoreError::ConstraintViolation`] when another field
    /// already uses the key.
    pub async fn upsert_field(
        &self,
        config_id: &ObjectId,
        field: ConfigField,
    ) -> FirestoreResult<Option<ConfigField>> {
        let outcome = self
            .modify(config_id, |doc| doc.try_upsert(field.clone()).map(|_| true))
            .await?;
        Ok(outcome.map(|_| field))
    }

    /// Remove a field. `None` if the document or the field does not exist.
    pub async fn delete_field(
        &self,
        config_id: &ObjectId,
        field_id: &ObjectId,
    ) -> FirestoreResult<Option<ObjectId>> {
        let outcome = self
            .modify(config_id, |doc| Ok(doc.remove_field(field_id)))
            .await?;
        Ok(match outcome {
            Some((_, true)) => Some(*field_id),
            _ => None,
        })
    }

    /// Read, mutate, and write back the `fields` array under an updateTime
    /// precondition. Concurrent writers cause a re-read.
    ///
    /// The closure returns whether it changed the document. Unchanged
    /// documents are not written.
    async fn modify<F>(
        &self,
        id: &ObjectId,
        mutate: F,
    ) -> FirestoreResult<Option<(ConfigDocument, bool)>>
    where
        F: Fn(&mut ConfigDocument) -> Result<bool, DuplicateKey>,
    {
        let doc_id = id.to_hex();

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(doc) = self.client.get_document(&self.collection, &doc_id).await? else {
                return Ok(None);
            };
            let update_time = doc.update_time.clone().ok_or_else(|| {
                FirestoreError::invalid_response(format!("config {} has no updateTime", id))
            })?;

            let mut config = document_to_config(&doc, id)?;
            let changed = mutate(&mut config)
                .map_err(|e| FirestoreError::ConstraintViolation(e.to_string()))?;
            if !changed {
                return Ok(Some((config, false)));
            }

            let mut fields = HashMap::new();
            fields.insert("fields".to_string(), fields_to_value(&config.fields));
            fields.insert("updated_at".to_string(), config.updated_at.to_firestore_value());

            let result = self
                .client
                .update_document(
                    &self.collection,
                    &doc_id,
                    fields,
                    Some(vec!["fields".to_string(), "updated_at".to_string()]),
                    Some(Precondition::update_time(update_time)),
                )
                .await;

            match result {
                Ok(written) => return Ok(Some((document_to_config(&written, id)?, true))),
                Err(e) if e.is_precondition_failed() => {
                    record_write_conflict(&self.collection);
                    warn!(
                        config_id = %id,
                        attempt,
                        "Config document changed concurrently, re-reading"
                    );
                }
                Err(FirestoreError::NotFound(_)) => return Ok(None),
                Err(e) => return Err(e),
            }
        }

        Err(FirestoreError::PreconditionFailed(format!(
            "config {} kept changing after {} attempts",
            id, MAX_WRITE_ATTEMPTS
        )))
    }
}

// =============================================================================
// Conversion
// =============================================================================

fn config_to_fields(config: &ConfigDocument) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), config.name.to_firestore_value());
    fields.insert("fields".to_string(), fields_to_value(&config.fields));
    fields.insert("created_at".to_string(), config.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), config.updated_at.to_firestore_value());
    fields
}

fn fields_to_value(fields: &[ConfigField]) -> Value {
    Value::array(
        fields
            .iter()
            .map(|f| {
                let mut map = HashMap::new();
                map.insert("_id".to_string(), f.id.to_hex().to_firestore_value());
                map.insert("key".to_string(), f.key.to_firestore_value());
                map.insert("value".to_string(), f.value.to_firestore_value());
                Value::map(map)
            })
            .collect(),
    )
}

/// Decode a configuration document.
pub fn document_to_config(doc: &Document, id: &ObjectId) -> FirestoreResult<ConfigDocument> {
    let name: String = doc.get("name").ok_or_else(|| {
        FirestoreError::invalid_response(format!("config {} has no name", id))
    })?;

    let fields = doc
        .field("fields")
        .map(|v| v.as_array())
        .unwrap_or_default()
        .iter()
        .map(|v| value_to_field(v, id))
        .collect::<FirestoreResult<Vec<_>>>()?;

    let created_at: DateTime<Utc> = doc.get("created_at").unwrap_or_else(Utc::now);
    let updated_at: DateTime<Utc> = doc.get("updated_at").unwrap_or(created_at);

    Ok(ConfigDocument {
        id: *id,
        name,
        fields,
        created_at,
        updated_at,
    })
}

fn value_to_field(value: &Value, config_id: &ObjectId) -> FirestoreResult<ConfigField> {
    let invalid = || {
        FirestoreError::invalid_response(format!("config {} has a malformed field entry", config_id))
    };

    let map = value.as_map().ok_or_else(invalid)?;
    let id = map
        .get("_id")
        .and_then(String::from_firestore_value)
        .and_then(|s| ObjectId::parse(&s).ok())
        .ok_or_else(invalid)?;
    let key = map
        .get("key")
        .and_then(String::from_firestore_value)
        .ok_or_else(invalid)?;
    let value = map
        .get("value")
        .and_then(serde_json::Value::from_firestore_value)
        .unwrap_or(serde_json::Value::Null);

    Ok(ConfigField::with_id(id, key, value))
}
