//! Gateway settings: public address, route templates, CV worker, status
//! codes and store selection.
//!
//! Loaded with the `config` crate from an optional file layered under
//! `VGW__SECTION__KEY` environment overrides, then validated once at startup.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use vgw_cv_client::{CvClientConfig, CvRoutes};
use vgw_firestore::{CONFIG_SETS_COLLECTION, VIDEOS_COLLECTION};
use vgw_models::{has_placeholder, RegistryError, StatusCodes, StatusRegistry, VIDEO_ID_PARAM};

/// Default settings file, resolved without extension.
pub const DEFAULT_SETTINGS_PATH: &str = "config/gateway";

const ENV_PREFIX: &str = "VGW";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{field} is not a valid URL: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{field} must contain the {{{placeholder}}} placeholder")]
    MissingPlaceholder {
        field: &'static str,
        placeholder: &'static str,
    },

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("invalid status codes: {0}")]
    StatusCodes(#[from] RegistryError),
}

/// Object-detection routes exposed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectionRoutes {
    pub sub_route: String,
    pub start: String,
    pub cancel: String,
    pub status: String,
}

impl Default for DetectionRoutes {
    fn default() -> Self {
        Self {
            sub_route: "/object-detection".to_string(),
            start: "/start/{video_id}".to_string(),
            cancel: "/cancel/{video_id}".to_string(),
            status: "/status/{video_id}".to_string(),
        }
    }
}

/// Public address of this gateway, used for hypermedia links.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebApiSettings {
    pub hostname: String,
    pub port: u16,
    /// Overrides the `hostname:port` root, e.g. behind a reverse proxy.
    pub public_base_url: Option<String>,
    pub object_detection: DetectionRoutes,
}

impl Default for WebApiSettings {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 8000,
            public_base_url: None,
            object_detection: DetectionRoutes::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CvApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub object_detection: CvRoutes,
}

impl Default for CvApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_secs: 10,
            object_detection: CvRoutes::default(),
        }
    }
}

impl CvApiSettings {
    pub fn client_config(&self) -> CvClientConfig {
        CvClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            routes: self.object_detection.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firestore,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub videos_collection: String,
    pub configs_collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Firestore,
            videos_collection: VIDEOS_COLLECTION.to_string(),
            configs_collection: CONFIG_SETS_COLLECTION.to_string(),
        }
    }
}

/// All gateway settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub web_api: WebApiSettings,
    pub cv_api: CvApiSettings,
    pub status_codes: StatusCodes,
    pub store: StoreSettings,
}

impl GatewaySettings {
    /// Load from `GATEWAY_CONFIG` (default `config/gateway`) and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let path =
            std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from a settings file, which may be absent, and the environment.
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check URLs, templates and timeouts.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(base) = &self.web_api.public_base_url {
            url::Url::parse(base).map_err(|source| SettingsError::InvalidUrl {
                field: "web_api.public_base_url",
                source,
            })?;
        }
        url::Url::parse(&self.cv_api.base_url).map_err(|source| SettingsError::InvalidUrl {
            field: "cv_api.base_url",
            source,
        })?;

        let templates = [
            ("web_api.object_detection.start", &self.web_api.object_detection.start),
            ("web_api.object_detection.cancel", &self.web_api.object_detection.cancel),
            ("web_api.object_detection.status", &self.web_api.object_detection.status),
            (
                "cv_api.object_detection.start_object_detection",
                &self.cv_api.object_detection.start_object_detection,
            ),
            (
                "cv_api.object_detection.cancel_object_detection",
                &self.cv_api.object_detection.cancel_object_detection,
            ),
        ];
        for (field, template) in templates {
            if !has_placeholder(template, VIDEO_ID_PARAM) {
                return Err(SettingsError::MissingPlaceholder {
                    field,
                    placeholder: VIDEO_ID_PARAM,
                });
            }
        }

        if self.cv_api.timeout_secs == 0 {
            return Err(SettingsError::NotPositive("cv_api.timeout_secs"));
        }

        self.status_registry()?;
        Ok(())
    }

    pub fn status_registry(&self) -> Result<StatusRegistry, SettingsError> {
        Ok(StatusRegistry::new(self.status_codes.clone())?)
    }
}
