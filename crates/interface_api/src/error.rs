//! API error handling
//!
//! Maps the reconciliation error taxonomy onto HTTP statuses:
//! validation rejections are 422, missing entities 404, concurrent
//! write conflicts 409. A failed commit is 502 (the attempt did not
//! land and may be retried); an indeterminate commit is 504 (the
//! outcome is unknown and the client must re-query before retrying).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_billing::{ReconcileError, StoreError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Commit outcome unknown: {0}")]
    Indeterminate(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
            ApiError::CommitFailed(msg) => (StatusCode::BAD_GATEWAY, "commit_failed", msg.clone()),
            ApiError::Indeterminate(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "commit_indeterminate", msg.clone())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match &err {
            ReconcileError::InvoiceNotFound(_) | ReconcileError::AccountNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ReconcileError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            ReconcileError::CommitFailed { .. } => ApiError::CommitFailed(err.to_string()),
            ReconcileError::Indeterminate { .. } => ApiError::Indeterminate(err.to_string()),
            _ if err.is_validation() => ApiError::Validation(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            StoreError::Indeterminate { .. } => ApiError::Indeterminate(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::InvoiceId;

    #[test]
    fn not_found_maps_to_404() {
        let api: ApiError = ReconcileError::InvoiceNotFound(InvoiceId::new()).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }

    #[test]
    fn conflict_maps_to_conflict() {
        let api: ApiError = ReconcileError::Conflict {
            invoice_id: InvoiceId::new(),
        }
        .into();
        assert!(matches!(api, ApiError::Conflict(_)));
    }
}
