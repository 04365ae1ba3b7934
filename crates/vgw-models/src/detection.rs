//! Object-detection job states and the registry that maps them to stored codes.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a video's object-detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStatus {
    /// No detection has been requested yet
    #[default]
    NotStarted,
    /// The worker accepted a start request and is running
    Started,
    /// A running job was canceled
    Canceled,
    /// The worker reported a failure
    Failed,
    /// The worker finished the job
    Completed,
}

impl DetectionStatus {
    pub const ALL: [DetectionStatus; 5] = [
        DetectionStatus::NotStarted,
        DetectionStatus::Started,
        DetectionStatus::Canceled,
        DetectionStatus::Failed,
        DetectionStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::NotStarted => "NOT_STARTED",
            DetectionStatus::Started => "STARTED",
            DetectionStatus::Canceled => "CANCELED",
            DetectionStatus::Failed => "FAILED",
            DetectionStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action a client may request against a detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionAction {
    Start,
    Cancel,
}

impl DetectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionAction::Start => "start",
            DetectionAction::Cancel => "cancel",
        }
    }

    /// Whether this action may be requested while the job is in `status`.
    ///
    /// Only the two API-initiated edges are guarded here. Completion and
    /// failure are reported by the worker itself.
    pub fn permits(&self, status: DetectionStatus) -> bool {
        match (self, status) {
            (DetectionAction::Start, DetectionStatus::NotStarted)
            | (DetectionAction::Start, DetectionStatus::Canceled)
            | (DetectionAction::Start, DetectionStatus::Failed) => true,
            (DetectionAction::Start, DetectionStatus::Started)
            | (DetectionAction::Start, DetectionStatus::Completed) => false,
            (DetectionAction::Cancel, DetectionStatus::Started) => true,
            (DetectionAction::Cancel, DetectionStatus::NotStarted)
            | (DetectionAction::Cancel, DetectionStatus::Canceled)
            | (DetectionAction::Cancel, DetectionStatus::Failed)
            | (DetectionAction::Cancel, DetectionStatus::Completed) => false,
        }
    }

    /// Human-readable reason returned when [`permits`](Self::permits) is false.
    pub fn rejection_reason(&self) -> &'static str {
        match self {
            DetectionAction::Start => "Object detection is either completed or started already",
            DetectionAction::Cancel => "Object detection is not yet started",
        }
    }
}

impl fmt::Display for DetectionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw status codes as they are persisted in video records.
///
/// Loaded from configuration; unknown keys are rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusCodes {
    pub not_started: String,
    pub started: String,
    pub canceled: String,
    pub failed: String,
    pub completed: String,
}

impl Default for StatusCodes {
    fn default() -> Self {
        Self {
            not_started: "0".to_string(),
            started: "1".to_string(),
            canceled: "2".to_string(),
            failed: "3".to_string(),
            completed: "4".to_string(),
        }
    }
}

impl StatusCodes {
    fn code_for(&self, status: DetectionStatus) -> &str {
        match status {
            DetectionStatus::NotStarted => &self.not_started,
            DetectionStatus::Started => &self.started,
            DetectionStatus::Canceled => &self.canceled,
            DetectionStatus::Failed => &self.failed,
            DetectionStatus::Completed => &self.completed,
        }
    }
}

/// Errors raised while building a [`StatusRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("status code for {0} is empty")]
    EmptyCode(DetectionStatus),

    #[error("status code {code:?} is shared by {first} and {second}")]
    DuplicateCode {
        code: String,
        first: DetectionStatus,
        second: DetectionStatus,
    },
}

/// Validated two-way mapping between [`DetectionStatus`] and stored codes.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    codes: StatusCodes,
    by_code: HashMap<String, DetectionStatus>,
}

impl StatusRegistry {
    /// Build a registry, rejecting empty or duplicated codes.
    pub fn new(codes: StatusCodes) -> Result<Self, RegistryError> {
        let mut by_code = HashMap::with_capacity(DetectionStatus::ALL.len());

        for status in DetectionStatus::ALL {
            let code = codes.code_for(status).trim();
            if code.is_empty() {
                return Err(RegistryError::EmptyCode(status));
            }
            if let Some(first) = by_code.insert(code.to_string(), status) {
                return Err(RegistryError::DuplicateCode {
                    code: code.to_string(),
                    first,
                    second: status,
                });
            }
        }

        Ok(Self { codes, by_code })
    }

    /// Decode a stored code. Returns `None` for codes the registry does not know.
    pub fn decode(&self, raw: &str) -> Option<DetectionStatus> {
        self.by_code.get(raw.trim()).copied()
    }

    /// Stored code for a status.
    pub fn encode(&self, status: DetectionStatus) -> &str {
        self.codes.code_for(status).trim()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        let codes = StatusCodes::default();
        let by_code = DetectionStatus::ALL
            .into_iter()
            .map(|status| (codes.code_for(status).to_string(), status))
            .collect();
        Self { codes, by_code }
    }
}
