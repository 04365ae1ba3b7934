//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::GateError;
use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned for every 5xx response.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0:?}")]
    Validation(Vec<FieldError>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::DuplicateKey(_)) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::InvalidIdentifier => ApiError::bad_request(err.to_string()),
            GateError::InvalidTransition(action) => {
                ApiError::forbidden(action.rejection_reason())
            }
            GateError::Store(e) => ApiError::Store(e),
            GateError::UpstreamUnavailable(e) => {
                ApiError::internal(format!("CV service call failed: {}", e))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

/// Render the full source chain of an error for logs.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ApiError::Validation(errors) = self {
            return (status, Json(errors)).into_response();
        }

        // Internal details stay in the logs.
        let message = match &self {
            ApiError::BadRequest(msg) | ApiError::Forbidden(msg) | ApiError::NotFound(msg) => {
                msg.clone()
            }
            ApiError::Store(StoreError::DuplicateKey(_)) => StoreError::DUPLICATED_FIELD.to_string(),
            _ => {
                error!(error = %error_chain(&self), "Request failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgw_models::DetectionAction;

    #[test]
    fn test_gate_errors_map_to_status_codes() {
        let err: ApiError = GateError::InvalidIdentifier.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ApiError = GateError::InvalidTransition(DetectionAction::Start).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(matches!(
            err,
            ApiError::Forbidden(ref msg) if msg == "Object detection is either completed or started already"
        ));
    }

    #[test]
    fn test_duplicate_key_is_bad_request() {
        let err = ApiError::Store(StoreError::DuplicateKey("fps".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_closed_store_is_internal() {
        let err = ApiError::Store(StoreError::Closed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
