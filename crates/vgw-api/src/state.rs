//! Application state.

use std::sync::Arc;

use thiserror::Error;

use vgw_cv_client::{CvClient, CvError};

use crate::config::ApiConfig;
use crate::response::LinkBuilder;
use crate::services::DetectionGate;
use crate::settings::{GatewaySettings, SettingsError, StoreBackend};
use crate::store::{FirestoreConnector, MemoryConnector, MemoryStore, StoreHandle};

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("failed to build CV client: {0}")]
    CvClient(#[from] CvError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<StoreHandle>,
    pub cv: Arc<CvClient>,
    pub gate: Arc<DetectionGate>,
    pub links: LinkBuilder,
}

impl AppState {
    /// Build state from validated settings. The store connects on first use.
    pub fn new(config: ApiConfig, settings: &GatewaySettings) -> Result<Self, StateError> {
        let store = match settings.store.backend {
            StoreBackend::Firestore => StoreHandle::new(FirestoreConnector {
                videos_collection: settings.store.videos_collection.clone(),
                configs_collection: settings.store.configs_collection.clone(),
                registry: Arc::new(settings.status_registry()?),
            }),
            StoreBackend::Memory => {
                StoreHandle::new(MemoryConnector::new(Arc::new(MemoryStore::new())))
            }
        };
        let cv = CvClient::new(settings.cv_api.client_config())?;

        Ok(Self::with_parts(config, settings, Arc::new(store), cv))
    }

    /// Build state around an existing store handle and CV client.
    pub fn with_parts(
        config: ApiConfig,
        settings: &GatewaySettings,
        store: Arc<StoreHandle>,
        cv: CvClient,
    ) -> Self {
        let links = LinkBuilder::new(&settings.web_api);
        let cv = Arc::new(cv);
        let gate = DetectionGate::new(store.clone(), cv.clone(), links.clone());

        Self {
            config,
            store,
            cv,
            gate: Arc::new(gate),
            links,
        }
    }
}
