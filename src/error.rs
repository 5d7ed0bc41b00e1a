//! Unified application error model and HTTP mapping.
//! One enum is used across the security primitives, the stores, the session
//! manager and the HTTP layer, so status mapping lives in exactly one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Fixed body for every denied request. The same shape is rendered for a
/// missing credential, a stale token, a forged refresh token and a
/// disallowed origin, so a caller learns nothing about which check failed.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad, missing or expired credential, or a disallowed origin.
    #[error("unauthorized")]
    Unauthorized,
    /// Refresh-token replay or forgery. Rendered identically to
    /// `Unauthorized` but logged as a security event at the raise site.
    #[error("invalid credential")]
    InvalidCredential,
    #[error("bad request: {0}")]
    UserInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// Backing store unavailable. Propagated upward unchanged.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// Entropy source failed while minting a code or token.
    #[error("random source failure: {0}")]
    RandomSource(String),
}

impl AppError {
    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AppError::UserInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::RandomSource(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message. Auth failures collapse to the fixed message and
    /// server-side failures are not echoed back to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::Unauthorized | AppError::InvalidCredential => UNAUTHORIZED_MESSAGE.into(),
            AppError::UserInput(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Persistence(_) => "service unavailable".into(),
            AppError::RandomSource(_) => "internal error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
