//! Configuration document handlers.
//!
//! Lookups on a missing document answer `data: null` rather than 404; only
//! renaming a missing document is an error.

use axum::extract::{Path, State};
use serde::Deserialize;
use validator::Validate;

use vgw_models::{ConfigField, ObjectId};

use crate::error::{ApiError, ApiResult};
use crate::handlers::extract::{parse_id, ValidatedJson};
use crate::response::{ConfigView, Envelope, FieldView, Links};
use crate::state::AppState;
use crate::store::ConfigStore;

/// Create or rename a configuration document.
#[derive(Debug, Deserialize, Validate)]
pub struct ConfigRequest {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 200, message = "name must be between 1 and 200 characters")
    )]
    pub name: Option<String>,
}

/// Create or replace a field.
#[derive(Debug, Deserialize, Validate)]
pub struct FieldRequest {
    #[validate(
        required(message = "key is required"),
        length(min = 1, max = 200, message = "key must be between 1 and 200 characters")
    )]
    pub key: Option<String>,

    #[serde(default)]
    pub value: serde_json::Value,
}

impl FieldRequest {
    fn into_field(self, id: ObjectId) -> ConfigField {
        ConfigField::with_id(id, self.key.unwrap_or_default(), self.value)
    }
}

/// List all configuration documents.
pub async fn list_configs(State(state): State<AppState>) -> ApiResult<Envelope<Vec<ConfigView>>> {
    let configs = state.store.list_configs().await?;
    let views = configs
        .into_iter()
        .map(|c| state.links.config_view(c))
        .collect();

    let mut links = Links::new();
    links.insert("self", state.links.configs_url());
    links.insert("create", state.links.configs_url());
    Ok(Envelope::with_links(views, links))
}

/// Get one configuration document.
pub async fn get_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Option<ConfigView>>> {
    let id = parse_id(&id, "id")?;
    let config = state.store.get_config(&id).await?;
    Ok(Envelope::new(config.map(|c| state.links.config_view(c))))
}

/// Create a configuration document.
pub async fn create_config(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ConfigRequest>,
) -> ApiResult<Envelope<ConfigView>> {
    let name = body.name.unwrap_or_default();
    let config = state.store.create_config(&name).await?;
    Ok(Envelope::new(state.links.config_view(config)))
}

/// Rename a configuration document.
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ConfigRequest>,
) -> ApiResult<Envelope<ConfigView>> {
    let id = parse_id(&id, "id")?;
    let name = body.name.unwrap_or_default();
    let config = state
        .store
        .rename_config(&id, &name)
        .await?
        .ok_or_else(|| ApiError::not_found("Config not found"))?;
    Ok(Envelope::new(state.links.config_view(config)))
}

/// Delete a configuration document.
pub async fn delete_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Option<ObjectId>>> {
    let id = parse_id(&id, "id")?;
    Ok(Envelope::new(state.store.delete_config(&id).await?))
}

/// Append a field with a generated id.
pub async fn create_field(
    State(state): State<AppState>,
    Path(config_id): Path<String>,
    ValidatedJson(body): ValidatedJson<FieldRequest>,
) -> ApiResult<Envelope<Option<FieldView>>> {
    let config_id = parse_id(&config_id, "configId")?;
    let field = body.into_field(ObjectId::new());
    let created = state.store.append_field(&config_id, field).await?;
    Ok(Envelope::new(
        created.map(|f| state.links.field_view(&config_id, f)),
    ))
}

/// Replace the field with this id, or add it under that id.
pub async fn put_field(
    State(state): State<AppState>,
    Path((config_id, field_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<FieldRequest>,
) -> ApiResult<Envelope<Option<FieldView>>> {
    let config_id = parse_id(&config_id, "configId")?;
    let field_id = parse_id(&field_id, "fieldId")?;
    let field = body.into_field(field_id);
    let stored = state.store.upsert_field(&config_id, field).await?;
    Ok(Envelope::new(
        stored.map(|f| state.links.field_view(&config_id, f)),
    ))
}

/// Remove a field.
pub async fn delete_field(
    State(state): State<AppState>,
    Path((config_id, field_id)): Path<(String, String)>,
) -> ApiResult<Envelope<Option<ObjectId>>> {
    let config_id = parse_id(&config_id, "configId")?;
    let field_id = parse_id(&field_id, "fieldId")?;
    Ok(Envelope::new(
        state.store.delete_field(&config_id, &field_id).await?,
    ))
}
