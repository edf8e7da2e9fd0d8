//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use unionpay_issuance::IssuanceError;

use crate::handlers::ApiResponse;

/// Errors returned by handlers, rendered in the response envelope
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed request body or query
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Issuance(#[from] IssuanceError),
}

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        ApiError::Unauthenticated(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Issuance(e) => match e {
                IssuanceError::Validation(_)
                | IssuanceError::SelfApproval { .. }
                | IssuanceError::AlreadyDecided { .. } => StatusCode::BAD_REQUEST,
                IssuanceError::NotFound(_) => StatusCode::NOT_FOUND,
                IssuanceError::Authorization(_) => StatusCode::FORBIDDEN,
                IssuanceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthenticated(msg) | ApiError::BadRequest(msg) => ApiResponse::error(msg),
            ApiError::Issuance(IssuanceError::Internal(detail)) => {
                error!(%detail, "internal error");
                ApiResponse::error("Internal server error")
            }
            ApiError::Issuance(e) => {
                let data = match &e {
                    IssuanceError::AlreadyDecided { current, .. } => {
                        json!({ "code": e.code(), "currentStatus": current })
                    }
                    _ => json!({ "code": e.code() }),
                };
                ApiResponse::error_with_data(e.to_string(), data)
            }
        };

        (status, Json(body)).into_response()
    }
}
