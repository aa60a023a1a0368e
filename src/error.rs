//! Error types for anchorage

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Main error type for anchoring and workflow operations
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Account not found on ledger: {0}")]
    AccountNotFound(String),

    #[error("Funding failed: {0}")]
    FundingFailed(String),

    #[error("Anchor submission failed: {0}")]
    AnchorFailed(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Confirmation timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnchorError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::FundingFailed(_) => StatusCode::BAD_GATEWAY,
            Self::AnchorFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Ledger(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnchorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for AnchorError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<reqwest::Error> for AnchorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Ledger(err.to_string())
    }
}

impl From<serde_json::Error> for AnchorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

/// Result type alias for anchorage operations
pub type Result<T> = std::result::Result<T, AnchorError>;
