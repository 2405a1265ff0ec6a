//! HTTP mapping of domain errors

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::DomainError;

#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// A conditional request arrived without its precondition header
    PreconditionRequired(&'static str),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PreconditionRequired(_) => StatusCode::PRECONDITION_REQUIRED,
            ApiError::Domain(e) => match e {
                DomainError::Conflict { .. } => StatusCode::CONFLICT,
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::Constraint(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DomainError::TransientStorage(_)
                | DomainError::RetriesExhausted { .. }
                | DomainError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                DomainError::Database(_) | DomainError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::PreconditionRequired(header) => json!({
                "error": format!(
                    "The {} header must carry the current ETag of the resource.",
                    header
                ),
                "kind": "precondition_required"
            }),
            ApiError::Domain(e) => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", e);
                } else {
                    tracing::debug!("Request rejected: {}", e);
                }
                json!({
                    "error": e.user_message(),
                    "kind": e.kind()
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
