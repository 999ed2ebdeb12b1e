use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

use crate::types::plaid::PlaidError;

#[derive(Debug, ThisError)]
pub enum DoughError {
    #[error("user is not logged in")]
    Unauthorized,

    #[error("public token is missing or empty")]
    InvalidToken,

    #[error("no access token stored for user")]
    NoCredential,

    #[error("Plaid unavailable: {0}")]
    ProviderUnavailable(#[from] ProviderFailure),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Why a call to Plaid did not produce a usable response.
#[derive(Debug, ThisError)]
pub enum ProviderFailure {
    /// Connect failure, timeout, or an undecodable body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} {}: {}", .error.error_code, .error.error_message)]
    Api {
        status: StatusCode,
        error: PlaidError,
    },
}

impl ProviderFailure {
    /// The provider's error payload, when Plaid answered with one.
    pub fn payload(&self) -> Option<&PlaidError> {
        match self {
            ProviderFailure::Api { error, .. } => Some(error),
            ProviderFailure::Transport(_) => None,
        }
    }
}

impl IntoResponse for DoughError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            DoughError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody::new("UNAUTHORIZED", "You must be signed in."),
            ),
            DoughError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new("INVALID_TOKEN", "A non-empty public_token is required."),
            ),
            DoughError::NoCredential => (
                StatusCode::PRECONDITION_FAILED,
                ApiErrorBody::new("NO_CREDENTIAL", "Link a bank account first."),
            ),
            DoughError::ProviderUnavailable(failure) => {
                // Only Plaid's end-user display_message may leave the server.
                let message = failure
                    .payload()
                    .and_then(|e| e.display_message.clone())
                    .unwrap_or_else(|| "Bank provider is unavailable; please try again.".into());
                (
                    StatusCode::BAD_GATEWAY,
                    ApiErrorBody {
                        code: "PROVIDER_UNAVAILABLE".to_string(),
                        message,
                    },
                )
            }
            DoughError::DatabaseError(_) | DoughError::Config(_) | DoughError::Figment(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("INTERNAL_ERROR", "An internal server error occurred."),
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiErrorBody {
    fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
