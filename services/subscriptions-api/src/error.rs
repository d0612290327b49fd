//! Error types for the subscriptions API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use subtrack_core::EngineError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Engine(err) => match err {
                EngineError::InvalidRequest(_)
                | EngineError::InvalidStatus
                | EngineError::StartAtRequired
                | EngineError::NoFieldsToUpdate => StatusCode::BAD_REQUEST,
                EngineError::SubscriptionTypeNotFound | EngineError::SubscriptionNotFound => {
                    StatusCode::NOT_FOUND
                }
                EngineError::SubscriptionAlreadyExists => StatusCode::CONFLICT,
                EngineError::PaymentProcessing(_) | EngineError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Engine(err) => match err {
                EngineError::InvalidRequest(_) => "INVALID_REQUEST",
                EngineError::InvalidStatus => "INVALID_STATUS",
                EngineError::StartAtRequired => "START_AT_REQUIRED",
                EngineError::NoFieldsToUpdate => "NO_FIELDS_TO_UPDATE",
                EngineError::SubscriptionTypeNotFound => "SUBSCRIPTION_TYPE_NOT_FOUND",
                EngineError::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
                EngineError::SubscriptionAlreadyExists => "SUBSCRIPTION_ALREADY_EXISTS",
                EngineError::PaymentProcessing(_) | EngineError::Database(_) => "INTERNAL_ERROR",
            },
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Internal error details stay in the logs, not in the response body
        let message = if self.is_internal() {
            tracing::error!(error = ?self, "Internal API error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
