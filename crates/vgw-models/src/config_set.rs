//! Configuration documents and their key/value fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object_id::ObjectId;

/// Single key/value entry of a configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ConfigField {
    /// Create a field with a freshly generated id.
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self::with_id(ObjectId::new(), key, value)
    }

    pub fn with_id(id: ObjectId, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id,
            key: key.into(),
            value,
        }
    }
}

/// Named bundle of settings.
///
/// Field keys are unique within a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ConfigField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfigDocument {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name: name.into(),
            fields: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, id: &ObjectId) -> Option<&ConfigField> {
        self.fields.iter().find(|f| &f.id == id)
    }

    /// True if a field other than `except` already uses `key`.
    pub fn has_key(&self, key: &str, except: Option<&ObjectId>) -> bool {
        self.fields
            .iter()
            .any(|f| f.key == key && Some(&f.id) != except)
    }

    /// Append a field, refusing a key that is already present.
    pub fn try_append(&mut self, field: ConfigField) -> Result<(), DuplicateKey> {
        if self.has_key(&field.key, None) {
            return Err(DuplicateKey(field.key));
        }
        self.fields.push(field);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the field with the same id, or append it if absent.
    ///
    /// Refuses a key already used by a different field.
    pub fn try_upsert(&mut self, field: ConfigField) -> Result<(), DuplicateKey> {
        if self.has_key(&field.key, Some(&field.id)) {
            return Err(DuplicateKey(field.key));
        }
        match self.fields.iter_mut().find(|f| f.id == field.id) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a field by id. Returns false if no such field exists.
    pub fn remove_field(&mut self, id: &ObjectId) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| &f.id != id);
        let removed = self.fields.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

/// A field key collided with an existing field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicated field key: {0}")]
pub struct DuplicateKey(pub String);
