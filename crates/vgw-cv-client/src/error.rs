//! CV client error types.

use thiserror::Error;

pub type CvResult<T> = Result<T, CvError>;

#[derive(Debug, Error)]
pub enum CvError {
    #[error("CV service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl CvError {
    /// HTTP status reported by the worker, if it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CvError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CvError::Rejected { .. } => "rejected",
            CvError::Timeout(_) => "timeout",
            CvError::Network(_) => "network",
        }
    }
}
