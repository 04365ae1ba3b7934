//! Object-detection handlers.

use axum::extract::{Path, State};

use crate::error::ApiResult;
use crate::response::{Empty, Envelope};
use crate::services::DetectionState;
use crate::state::AppState;

/// Ask the CV worker to start detection for a video.
pub async fn start_object_detection(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Envelope<Empty>> {
    let links = state.gate.request_start(&video_id).await?;
    Ok(Envelope::with_links(Empty {}, links))
}

/// Ask the CV worker to cancel a running job.
pub async fn cancel_object_detection(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Envelope<Empty>> {
    let links = state.gate.request_cancel(&video_id).await?;
    Ok(Envelope::with_links(Empty {}, links))
}

/// Current detection status of a video.
pub async fn get_object_detection_status(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Envelope<DetectionState>> {
    let (detection, links) = state.gate.status(&video_id).await?;
    Ok(Envelope::with_links(detection, links))
}
