//! Response envelopes and hypermedia links.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vgw_models::{format_video_route, ConfigDocument, ConfigField, ObjectId};

use crate::settings::{DetectionRoutes, WebApiSettings};

/// Prefix of the configuration routes.
pub const CONFIG_ROUTE: &str = "/config";

/// Prefix of the configuration field routes.
pub const CONFIG_FIELD_ROUTE: &str = "/config/field";

/// Link name to URL.
pub type Links = BTreeMap<&'static str, String>;

/// `{ data, _links? }` body returned by every successful request.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(rename = "_links", skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data, links: None }
    }

    pub fn with_links(data: T, links: Links) -> Self {
        Self {
            data,
            links: Some(links),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Empty JSON object payload.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

/// Builds absolute URLs from identifiers and the configured route templates.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    root: String,
    detection: DetectionRoutes,
}

impl LinkBuilder {
    pub fn new(web: &WebApiSettings) -> Self {
        let root = match &web.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => {
                let scheme = if web.port == 443 { "https" } else { "http" };
                format!("{}://{}:{}", scheme, web.hostname, web.port)
            }
        };
        Self {
            root,
            detection: web.object_detection.clone(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn detection_routes(&self) -> &DetectionRoutes {
        &self.detection
    }

    // =========================================================================
    // Object detection
    // =========================================================================

    fn detection_url(&self, template: &str, video_id: &ObjectId) -> String {
        format!(
            "{}{}{}",
            self.root,
            self.detection.sub_route,
            format_video_route(template, &video_id.to_hex())
        )
    }

    pub fn start_url(&self, video_id: &ObjectId) -> String {
        self.detection_url(&self.detection.start, video_id)
    }

    pub fn cancel_url(&self, video_id: &ObjectId) -> String {
        self.detection_url(&self.detection.cancel, video_id)
    }

    pub fn status_url(&self, video_id: &ObjectId) -> String {
        self.detection_url(&self.detection.status, video_id)
    }

    // =========================================================================
    // Configuration documents
    // =========================================================================

    pub fn configs_url(&self) -> String {
        format!("{}{}", self.root, CONFIG_ROUTE)
    }

    pub fn config_url(&self, id: &ObjectId) -> String {
        format!("{}{}/{}", self.root, CONFIG_ROUTE, id)
    }

    pub fn config_fields_url(&self, config_id: &ObjectId) -> String {
        format!("{}{}/{}", self.root, CONFIG_FIELD_ROUTE, config_id)
    }

    pub fn field_url(&self, config_id: &ObjectId, field_id: &ObjectId) -> String {
        format!("{}{}/{}/{}", self.root, CONFIG_FIELD_ROUTE, config_id, field_id)
    }

    pub fn config_links(&self, id: &ObjectId) -> Links {
        let mut links = Links::new();
        links.insert("collection", self.configs_url());
        links.insert("create", self.configs_url());
        links.insert("self", self.config_url(id));
        links.insert("fields", self.config_fields_url(id));
        links.insert("createField", self.config_fields_url(id));
        links
    }

    pub fn field_links(&self, config_id: &ObjectId, field_id: &ObjectId) -> Links {
        let mut links = Links::new();
        links.insert("self", self.field_url(config_id, field_id));
        links
    }

    pub fn config_view(&self, config: ConfigDocument) -> ConfigView {
        let fields = config
            .fields
            .into_iter()
            .map(|f| self.field_view(&config.id, f))
            .collect();
        ConfigView {
            links: self.config_links(&config.id),
            id: config.id,
            name: config.name,
            fields,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }

    pub fn field_view(&self, config_id: &ObjectId, field: ConfigField) -> FieldView {
        FieldView {
            links: self.field_links(config_id, &field.id),
            id: field.id,
            key: field.key,
            value: field.value,
        }
    }
}

/// Configuration document as returned to clients.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub fields: Vec<FieldView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "_links")]
    pub links: Links,
}

/// Field as returned to clients.
#[derive(Debug, Serialize)]
pub struct FieldView {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(rename = "_links")]
    pub links: Links,
}
