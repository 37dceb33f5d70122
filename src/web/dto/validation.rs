//! Request body extraction with field validation.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// JSON body that has passed its `validator` rules.
///
/// Malformed bodies become `BAD_REQUEST`; rule violations become
/// `VALIDATION_ERROR` with per-field details.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => body,
            Err(rejection) => {
                return Err(ApiError::bad_request(format!(
                    "Invalid JSON: {}",
                    rejection.body_text()
                )))
            }
        };

        body.validate().map_err(ApiError::from_validation_errors)?;
        Ok(Self(body))
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Names and emails are single-line: any control character is rejected.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    match value.chars().any(char::is_control) {
        true => Err(rule(
            "no_control_chars",
            "Must not contain control characters",
        )),
        false => Ok(()),
    }
}

pub fn not_empty_trimmed(value: &str) -> Result<(), ValidationError> {
    match value.trim().is_empty() {
        true => Err(rule("not_empty_trimmed", "Must not be empty")),
        false => Ok(()),
    }
}

/// User ids in a share list must be positive.
pub fn positive_ids(ids: &[i64]) -> Result<(), ValidationError> {
    match ids.iter().any(|&id| id <= 0) {
        true => Err(rule("positive_ids", "User ids must be positive")),
        false => Ok(()),
    }
}
