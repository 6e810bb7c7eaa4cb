//! Unified error handling for the Shopdesk API.
//!
//! Every failure leaving the server is rendered as `{"message", "errorKind"}`
//! with a status code derived from its [`ErrorKind`].

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shopdesk_core::OrderStatus;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::paystack::GatewayError;

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidRequest,
    Conflict,
    GatewayUnavailable,
    PaymentNotVerified,
    StorageError,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller has no identity or lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request failed validation before any state was touched.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request conflicts with the current state of a resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Status change not permitted by the order transition table.
    #[error("Invalid transition: order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Gateway answered, but the transaction is not a completed payment.
    #[error("Payment not verified: {0}")]
    PaymentNotVerified(String),

    /// Gateway could not be reached or answered with a server-side failure.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(#[from] GatewayError),

    /// Persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(RepositoryError),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("record not found".to_owned()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl AppError {
    /// Category reported in the `errorKind` field.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Conflict(_) | Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::PaymentNotVerified(_) => ErrorKind::PaymentNotVerified,
            Self::GatewayUnavailable(_) => ErrorKind::GatewayUnavailable,
            Self::Storage(_) => ErrorKind::StorageError,
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::PaymentNotVerified(_) => StatusCode::PAYMENT_REQUIRED,
            Self::GatewayUnavailable(GatewayError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    message: String,
    error_kind: ErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Storage(_) | Self::GatewayUnavailable(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request failed"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Storage(_) => "Internal server error".to_owned(),
            Self::GatewayUnavailable(GatewayError::Timeout) => {
                "Payment gateway timed out".to_owned()
            }
            Self::GatewayUnavailable(_) => "Payment gateway unavailable".to_owned(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            message,
            error_kind: self.kind(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}

/// JSON extractor that reports malformed bodies as [`AppError::InvalidRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query-string extractor that reports malformed queries as [`AppError::InvalidRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

impl<T: Serialize> IntoResponse for AppJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}
