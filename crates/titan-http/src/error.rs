use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use titan_core::TitanError;

/// Wire-facing error: one JSON object `{"detail": …}` plus the mapped
/// status. Internal causes never leak beyond their display message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<TitanError> for ApiError {
    fn from(err: TitanError) -> Self {
        let status = match &err {
            TitanError::MissingField(_)
            | TitanError::InvalidKey(_)
            | TitanError::DuplicateKey(_)
            | TitanError::SlotTimeout => StatusCode::UNPROCESSABLE_ENTITY,
            TitanError::NotAuthorized
            | TitanError::ChallengeMismatch
            | TitanError::SignatureRejected => StatusCode::FORBIDDEN,
            TitanError::Signing(_)
            | TitanError::Config { .. }
            | TitanError::Serialization(_)
            | TitanError::Storage(_)
            | TitanError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
