//! HTTP error handling and response types.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::repository::RepositoryError;
use crate::scheduling::{ErrorKind, SchedulingError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Rejected or failed booking operation
    Scheduling(SchedulingError),
    /// Invalid request (malformed body, bad header, blank field)
    BadRequest(String),
    /// Repository error from reference-data reads and writes
    Repository(RepositoryError),
}

/// Status code for a scheduling error category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::ReferentialIntegrity | ErrorKind::Temporal => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ApiError) {
        match self {
            AppError::Scheduling(e) => {
                let kind = e.kind();
                (status_for(kind), ApiError::new(kind.code(), e.to_string()))
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new(ErrorKind::Validation.code(), msg),
            ),
            AppError::Repository(e) => {
                let context = e.context();
                let details = (!context.is_empty()).then(|| context.to_string());
                let (status, kind) = if e.is_retryable() {
                    (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::Transient)
                } else if e.is_not_found() {
                    (StatusCode::NOT_FOUND, ErrorKind::NotFound)
                } else if let RepositoryError::ValidationError { .. } = e {
                    (StatusCode::BAD_REQUEST, ErrorKind::Validation)
                } else if let RepositoryError::MissingReference { .. } = e {
                    (StatusCode::BAD_REQUEST, ErrorKind::ReferentialIntegrity)
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal)
                };
                let message = match &e {
                    RepositoryError::ValidationError { message, .. }
                    | RepositoryError::NotFound { message, .. } => message.clone(),
                    RepositoryError::MissingReference { entity, id, .. } => {
                        format!("{} {} does not exist.", capitalize(entity), id)
                    }
                    other => other.to_string(),
                };
                let body = ApiError::new(kind.code(), message);
                match details {
                    Some(details) => (status, body.with_details(details)),
                    None => (status, body),
                }
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        if status.is_server_error() {
            warn!(status = status.as_u16(), code = %error.code, message = %error.message, "request failed");
        }
        (status, Json(error)).into_response()
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        AppError::Scheduling(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
