//! CV service HTTP client.

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, warn};

use vgw_models::{format_video_route, ObjectId};

use crate::error::{CvError, CvResult};
use crate::metrics::record_request;
use crate::types::{CvOperation, CvRoutes, HealthResponse};

/// Configuration for the CV client.
#[derive(Debug, Clone)]
pub struct CvClientConfig {
    /// Base URL of the CV service
    pub base_url: String,
    /// Upper bound for every call
    pub timeout: Duration,
    /// Route templates
    pub routes: CvRoutes,
}

impl Default for CvClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout: Duration::from_secs(10),
            routes: CvRoutes::default(),
        }
    }
}

impl CvClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("CV_SERVICE_URL").unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                std::env::var("CV_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),
            routes: defaults.routes,
        }
    }
}

/// Client for the CV worker.
///
/// Calls are never retried: the worker does not deduplicate start requests.
#[derive(Clone)]
pub struct CvClient {
    http: Client,
    config: CvClientConfig,
}

impl CvClient {
    /// Create a new CV client.
    pub fn new(config: CvClientConfig) -> CvResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(CvError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> CvResult<Self> {
        Self::new(CvClientConfig::from_env())
    }

    pub fn config(&self) -> &CvClientConfig {
        &self.config
    }

    /// Full URL of a worker operation for a video.
    pub fn operation_url(&self, operation: CvOperation, video_id: &ObjectId) -> String {
        let template = match operation {
            CvOperation::StartObjectDetection => &self.config.routes.start_object_detection,
            CvOperation::CancelObjectDetection => &self.config.routes.cancel_object_detection,
        };
        format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.routes.sub_route,
            format_video_route(template, &video_id.to_hex())
        )
    }

    /// Ask the worker to start object detection for a video.
    pub async fn start_object_detection(&self, video_id: &ObjectId) -> CvResult<()> {
        self.call(CvOperation::StartObjectDetection, video_id).await
    }

    /// Ask the worker to cancel a running detection job.
    pub async fn cancel_object_detection(&self, video_id: &ObjectId) -> CvResult<()> {
        self.call(CvOperation::CancelObjectDetection, video_id).await
    }

    /// Check if the CV service is healthy.
    pub async fn health_check(&self) -> CvResult<bool> {
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                // Some workers answer with an empty body.
                match response.json::<HealthResponse>().await {
                    Ok(health) => Ok(health.status == "healthy" || health.status == "ok"),
                    Err(_) => Ok(true),
                }
            }
            Ok(response) => {
                warn!("CV service health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("CV service health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn call(&self, operation: CvOperation, video_id: &ObjectId) -> CvResult<()> {
        let url = self.operation_url(operation, video_id);
        debug!("Sending {} request to {}", operation.as_str(), url);

        let start = Instant::now();
        let result = self.send(&url).await;
        let elapsed = start.elapsed().as_secs_f64();

        let status = match &result {
            Ok(code) => code.to_string(),
            Err(e) => e
                .upstream_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| e.kind().to_string()),
        };
        record_request(operation.as_str(), &status, elapsed);

        match result {
            Ok(_) => {
                info!(video_id = %video_id, "CV service accepted {}", operation.as_str());
                Ok(())
            }
            Err(e) => {
                warn!(video_id = %video_id, "CV {} failed: {}", operation.as_str(), e);
                Err(e)
            }
        }
    }

    async fn send(&self, url: &str) -> CvResult<u16> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CvError::Timeout(self.config.timeout.as_secs())
            } else {
                CvError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CvError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(status.as_u16())
    }
}
