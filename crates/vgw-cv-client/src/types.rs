//! CV service routes and payloads.

use serde::{Deserialize, Serialize};

/// Worker routes, relative to the service base URL.
///
/// `start` and `cancel` are templates carrying a `{video_id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvRoutes {
    pub sub_route: String,
    pub start_object_detection: String,
    pub cancel_object_detection: String,
}

impl Default for CvRoutes {
    fn default() -> Self {
        Self {
            sub_route: "/object-detection".to_string(),
            start_object_detection: "/start/{video_id}".to_string(),
            cancel_object_detection: "/cancel/{video_id}".to_string(),
        }
    }
}

/// Operations the worker exposes for a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvOperation {
    StartObjectDetection,
    CancelObjectDetection,
}

impl CvOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CvOperation::StartObjectDetection => "start_object_detection",
            CvOperation::CancelObjectDetection => "cancel_object_detection",
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
