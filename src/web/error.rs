//! Error responses of the HTTP API.
//!
//! Every failure is rendered as
//! `{"error": {"code": "...", "message": "...", "details": {...}}}`,
//! where `details` only appears for field validation failures.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::CabinetError;

/// Machine-readable error code, serialized in SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    InternalError,
    Timeout,
}

impl From<ErrorCode> for StatusCode {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::BadRequest | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Field name to the messages of every rule it broke.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Serialize)]
struct Envelope<'a> {
    error: &'a ApiError,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PayloadTooLarge, message)
    }

    /// Hides `message` from the client and logs it instead.
    pub fn internal(message: impl fmt::Display) -> Self {
        tracing::error!("Internal error: {}", message);
        Self::new(ErrorCode::InternalError, "An internal error occurred")
    }

    /// Collects the field errors reported by `validator`.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let details: FieldErrors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => format!("Invalid value for {field}"),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self {
            code: ErrorCode::ValidationError,
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(self.code);
        (status, Json(Envelope { error: &self })).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<CabinetError> for ApiError {
    fn from(err: CabinetError) -> Self {
        match err {
            CabinetError::Auth(msg) => Self::unauthorized(msg),
            CabinetError::Permission(msg) => Self::new(ErrorCode::Forbidden, msg),
            CabinetError::Validation(msg) => Self::bad_request(msg),
            CabinetError::Conflict(msg) => Self::new(ErrorCode::Conflict, msg),
            CabinetError::NotFound(what) => Self::not_found(format!("{what} not found")),
            CabinetError::Timeout(what) => {
                Self::new(ErrorCode::Timeout, format!("{what} timed out"))
            }
            other => Self::internal(other),
        }
    }
}
