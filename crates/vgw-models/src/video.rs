//! Video record as seen by the gateway.

use serde::{Deserialize, Serialize};

use crate::detection::{DetectionAction, DetectionStatus};
use crate::object_id::ObjectId;

/// Stored field holding the raw detection status code.
pub const DETECTION_STATUS_FIELD: &str = "object_detection_status";

/// Persisted video and the current state of its detection job.
///
/// The gateway only reads these records. Status transitions are written by
/// the CV worker. A record without a status permits neither start nor
/// cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub detection_status: Option<DetectionStatus>,
}

impl VideoRecord {
    pub fn new(id: ObjectId, detection_status: DetectionStatus) -> Self {
        Self {
            id,
            detection_status: Some(detection_status),
        }
    }

    /// A record whose status field is absent or null.
    pub fn without_status(id: ObjectId) -> Self {
        Self {
            id,
            detection_status: None,
        }
    }

    pub fn permits(&self, action: DetectionAction) -> bool {
        self.detection_status
            .is_some_and(|status| action.permits(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_status_permits_nothing() {
        let record = VideoRecord::without_status(ObjectId::new());
        assert!(!record.permits(DetectionAction::Start));
        assert!(!record.permits(DetectionAction::Cancel));
    }

    #[test]
    fn test_status_drives_permissions() {
        let record = VideoRecord::new(ObjectId::new(), DetectionStatus::Started);
        assert!(!record.permits(DetectionAction::Start));
        assert!(record.permits(DetectionAction::Cancel));
    }
}
