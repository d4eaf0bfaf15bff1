//! The five abstract error kinds, mapped to an HTTP status and JSON body
//! in exactly one place rather than per-handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    DependencyUnavailable,
    Overload,
    InternalFailure,
}

#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub fields: Vec<FieldError>,
}

impl ApiError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::InvalidInput, message: message.into(), fields: Vec::new() }
    }

    pub fn invalid_fields(fields: Vec<FieldError>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: "request validation failed".to_string(),
            fields,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::NotFound, message: message.into(), fields: Vec::new() }
    }

    pub fn dependency_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::DependencyUnavailable,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn overload(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Overload, message: message.into(), fields: Vec::new() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::InternalFailure, message: message.into(), fields: Vec::new() }
    }

    fn status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            // DependencyUnavailable is kept distinct from InternalFailure
            // for logging; both render 500 to the caller.
            ErrorKind::DependencyUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Overload => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error should be logged to `system_events` with
    /// severity=error. Validation and not-found outcomes are expected
    /// traffic, not system errors.
    pub fn is_system_error(&self) -> bool {
        !matches!(self.kind, ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            success: false,
            error: self.message,
            fields: self.fields.iter().map(|f| f.to_string()).collect(),
        };
        (status, Json(body)).into_response()
    }
}
