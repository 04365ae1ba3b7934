//! Object-detection orchestration.
//!
//! Checks the video's current detection status before asking the CV worker
//! to start or cancel a job. The worker is never contacted for a malformed
//! id, an unknown video or a forbidden transition.
//!
//! The status read and the worker call are not atomic. Two concurrent start
//! requests for the same video can both pass the check; the worker is the
//! one that updates the record.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use vgw_cv_client::{CvClient, CvError};
use vgw_models::{DetectionAction, DetectionStatus, ObjectId, VideoRecord};

use crate::metrics::record_detection_request;
use crate::response::{LinkBuilder, Links};
use crate::store::{StoreError, VideoStore};

/// Remote worker that runs detection jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetectionWorker: Send + Sync {
    async fn start_object_detection(&self, video_id: &ObjectId) -> Result<(), CvError>;

    async fn cancel_object_detection(&self, video_id: &ObjectId) -> Result<(), CvError>;
}

#[async_trait]
impl DetectionWorker for CvClient {
    async fn start_object_detection(&self, video_id: &ObjectId) -> Result<(), CvError> {
        CvClient::start_object_detection(self, video_id).await
    }

    async fn cancel_object_detection(&self, video_id: &ObjectId) -> Result<(), CvError> {
        CvClient::cancel_object_detection(self, video_id).await
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed id, or no video with that id.
    #[error("Invalid videoId")]
    InvalidIdentifier,

    #[error("{0} is not permitted in the current detection status")]
    InvalidTransition(DetectionAction),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("CV service unavailable: {0}")]
    UpstreamUnavailable(#[source] CvError),
}

impl GateError {
    fn outcome(&self) -> &'static str {
        match self {
            GateError::InvalidIdentifier => "invalid_id",
            GateError::InvalidTransition(_) => "forbidden",
            GateError::Store(_) => "store_error",
            GateError::UpstreamUnavailable(_) => "upstream_error",
        }
    }
}

/// Current detection state of a video. `status` is null when the record
/// carries none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionState {
    pub video_id: ObjectId,
    pub status: Option<DetectionStatus>,
}

pub struct DetectionGate {
    videos: Arc<dyn VideoStore>,
    worker: Arc<dyn DetectionWorker>,
    links: LinkBuilder,
}

impl DetectionGate {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        worker: Arc<dyn DetectionWorker>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            videos,
            worker,
            links,
        }
    }

    /// Start detection. Links: `self`, `cancel`.
    pub async fn request_start(&self, video_id: &str) -> Result<Links, GateError> {
        self.request(DetectionAction::Start, video_id).await
    }

    /// Cancel a running job. Links: `self`.
    pub async fn request_cancel(&self, video_id: &str) -> Result<Links, GateError> {
        self.request(DetectionAction::Cancel, video_id).await
    }

    /// Current status, with links to the actions it permits.
    pub async fn status(&self, video_id: &str) -> Result<(DetectionState, Links), GateError> {
        let video = self.load(video_id).await?;

        let mut links = Links::new();
        links.insert("self", self.links.status_url(&video.id));
        if video.permits(DetectionAction::Start) {
            links.insert("start", self.links.start_url(&video.id));
        }
        if video.permits(DetectionAction::Cancel) {
            links.insert("cancel", self.links.cancel_url(&video.id));
        }

        Ok((
            DetectionState {
                video_id: video.id,
                status: video.detection_status,
            },
            links,
        ))
    }

    async fn request(&self, action: DetectionAction, video_id: &str) -> Result<Links, GateError> {
        let result = self.try_request(action, video_id).await;
        let outcome = match &result {
            Ok(_) => "accepted",
            Err(e) => e.outcome(),
        };
        record_detection_request(action.as_str(), outcome);
        result
    }

    async fn try_request(
        &self,
        action: DetectionAction,
        video_id: &str,
    ) -> Result<Links, GateError> {
        let video = self.load(video_id).await?;

        if !video.permits(action) {
            debug!(
                video_id = %video.id,
                status = ?video.detection_status,
                "Refusing {} request",
                action
            );
            return Err(GateError::InvalidTransition(action));
        }

        let call = match action {
            DetectionAction::Start => self.worker.start_object_detection(&video.id).await,
            DetectionAction::Cancel => self.worker.cancel_object_detection(&video.id).await,
        };
        call.map_err(GateError::UpstreamUnavailable)?;

        info!(video_id = %video.id, "Object detection {} requested", action);

        let mut links = Links::new();
        match action {
            DetectionAction::Start => {
                links.insert("self", self.links.start_url(&video.id));
                links.insert("cancel", self.links.cancel_url(&video.id));
            }
            DetectionAction::Cancel => {
                links.insert("self", self.links.cancel_url(&video.id));
            }
        }
        Ok(links)
    }

    async fn load(&self, video_id: &str) -> Result<VideoRecord, GateError> {
        let id = ObjectId::parse(video_id).map_err(|_| GateError::InvalidIdentifier)?;
        self.videos
            .find_video(&id)
            .await?
            .ok_or(GateError::InvalidIdentifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WebApiSettings;
    use crate::store::MockVideoStore;

    const VIDEO: &str = "507f1f77bcf86cd799439011";

    fn links() -> LinkBuilder {
        LinkBuilder::new(&WebApiSettings::default())
    }

    fn store_with(status: DetectionStatus) -> MockVideoStore {
        let mut store = MockVideoStore::new();
        store
            .expect_find_video()
            .returning(move |id| Ok(Some(VideoRecord::new(*id, status))));
        store
    }

    fn gate(store: MockVideoStore, worker: MockDetectionWorker) -> DetectionGate {
        DetectionGate::new(Arc::new(store), Arc::new(worker), links())
    }

    #[tokio::test]
    async fn test_malformed_id_touches_nothing() {
        let mut store = MockVideoStore::new();
        store.expect_find_video().never();
        let mut worker = MockDetectionWorker::new();
        worker.expect_start_object_detection().never();
        worker.expect_cancel_object_detection().never();

        let gate = gate(store, worker);
        assert!(matches!(
            gate.request_start("not-an-id").await,
            Err(GateError::InvalidIdentifier)
        ));
        assert!(matches!(
            gate.request_cancel("not-an-id").await,
            Err(GateError::InvalidIdentifier)
        ));
    }

    #[tokio::test]
    async fn test_unknown_video_is_invalid_identifier() {
        let mut store = MockVideoStore::new();
        store.expect_find_video().returning(|_| Ok(None));
        let mut worker = MockDetectionWorker::new();
        worker.expect_start_object_detection().never();

        let err = gate(store, worker).request_start(VIDEO).await.unwrap_err();
        assert!(matches!(err, GateError::InvalidIdentifier));
        assert_eq!(err.to_string(), "Invalid videoId");
    }

    #[tokio::test]
    async fn test_start_from_restartable_states_calls_worker_once() {
        for status in [
            DetectionStatus::NotStarted,
            DetectionStatus::Canceled,
            DetectionStatus::Failed,
        ] {
            let mut worker = MockDetectionWorker::new();
            worker
                .expect_start_object_detection()
                .times(1)
                .returning(|_| Ok(()));
            worker.expect_cancel_object_detection().never();

            let links = gate(store_with(status), worker)
                .request_start(VIDEO)
                .await
                .unwrap();
            assert_eq!(
                links.get("self").unwrap(),
                &format!("http://localhost:8000/object-detection/start/{}", VIDEO)
            );
            assert_eq!(
                links.get("cancel").unwrap(),
                &format!("http://localhost:8000/object-detection/cancel/{}", VIDEO)
            );
        }
    }

    #[tokio::test]
    async fn test_start_refused_while_started_or_completed() {
        for status in [DetectionStatus::Started, DetectionStatus::Completed] {
            let mut worker = MockDetectionWorker::new();
            worker.expect_start_object_detection().never();

            let err = gate(store_with(status), worker)
                .request_start(VIDEO)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                GateError::InvalidTransition(DetectionAction::Start)
            ));
        }
    }

    #[tokio::test]
    async fn test_cancel_while_started_calls_worker_once() {
        let mut worker = MockDetectionWorker::new();
        worker
            .expect_cancel_object_detection()
            .times(1)
            .returning(|_| Ok(()));

        let links = gate(store_with(DetectionStatus::Started), worker)
            .request_cancel(VIDEO)
            .await
            .unwrap();
        assert_eq!(links.len(), 1);
        assert!(links["self"].ends_with(&format!("/cancel/{}", VIDEO)));
    }

    #[tokio::test]
    async fn test_cancel_refused_unless_started() {
        for status in [
            DetectionStatus::NotStarted,
            DetectionStatus::Canceled,
            DetectionStatus::Failed,
            DetectionStatus::Completed,
        ] {
            let mut worker = MockDetectionWorker::new();
            worker.expect_cancel_object_detection().never();

            let err = gate(store_with(status), worker)
                .request_cancel(VIDEO)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                GateError::InvalidTransition(DetectionAction::Cancel)
            ));
        }
    }

    #[tokio::test]
    async fn test_worker_failure_is_upstream_unavailable() {
        let mut worker = MockDetectionWorker::new();
        worker
            .expect_start_object_detection()
            .times(1)
            .returning(|_| Err(CvError::Timeout(10)));

        let err = gate(store_with(DetectionStatus::NotStarted), worker)
            .request_start(VIDEO)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::UpstreamUnavailable(CvError::Timeout(10))));
    }

    #[tokio::test]
    async fn test_status_links_follow_permitted_actions() {
        let worker = MockDetectionWorker::new();
        let (state, links) = gate(store_with(DetectionStatus::Started), worker)
            .status(VIDEO)
            .await
            .unwrap();
        assert_eq!(state.status, Some(DetectionStatus::Started));
        assert!(links.contains_key("self"));
        assert!(links.contains_key("cancel"));
        assert!(!links.contains_key("start"));

        let worker = MockDetectionWorker::new();
        let (_, links) = gate(store_with(DetectionStatus::Failed), worker)
            .status(VIDEO)
            .await
            .unwrap();
        assert!(links.contains_key("start"));
        assert!(!links.contains_key("cancel"));
    }

    #[tokio::test]
    async fn test_video_without_status_refuses_both_actions() {
        let mut store = MockVideoStore::new();
        store
            .expect_find_video()
            .returning(|id| Ok(Some(VideoRecord::without_status(*id))));
        let mut worker = MockDetectionWorker::new();
        worker.expect_start_object_detection().never();
        worker.expect_cancel_object_detection().never();
        let gate = gate(store, worker);

        assert!(matches!(
            gate.request_start(VIDEO).await,
            Err(GateError::InvalidTransition(DetectionAction::Start))
        ));
        assert!(matches!(
            gate.request_cancel(VIDEO).await,
            Err(GateError::InvalidTransition(DetectionAction::Cancel))
        ));

        let (state, links) = gate.status(VIDEO).await.unwrap();
        assert_eq!(state.status, None);
        assert_eq!(links.len(), 1);
    }
}
