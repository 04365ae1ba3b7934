//! Request extractors.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use vgw_models::ObjectId;

use crate::error::{ApiError, FieldError};

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON is a 400 with a message; failed checks are a 400 with one
/// entry per field.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(field_errors(&errors)))?;

        Ok(Self(value))
    }
}

/// Flatten validator output, sorted by field name.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| FieldError {
                field: field.clone(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Parse an id path parameter. `param` names it in the error message.
pub fn parse_id(raw: &str, param: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse(raw).map_err(|_| ApiError::bad_request(format!("{} is not valid", param)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Validate)]
    struct Body {
        #[validate(required(message = "name is required"))]
        name: Option<String>,
    }

    #[test]
    fn test_field_errors_use_messages() {
        let errors = Body { name: None }.validate().unwrap_err();
        assert_eq!(
            field_errors(&errors),
            vec![FieldError {
                field: "name".to_string(),
                message: "name is required".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_id_names_parameter() {
        let err = parse_id("nope", "configId").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "configId is not valid"));
        assert!(parse_id("507f1f77bcf86cd799439011", "id").is_ok());
    }
}
