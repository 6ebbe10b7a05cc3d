use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;

/// Failures of the lifecycle engine. Every failed operation leaves the
/// delivery and its history untouched.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order {0} already has a delivery")]
    DuplicateOrder(String),

    #[error("delivery {0} is not available for acceptance")]
    NotAvailable(Uuid),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rider {0} is inactive")]
    RiderInactive(Uuid),

    #[error("cannot transition from {from} to {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl DeliveryError {
    /// Stable label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryError::Validation(_) => "validation",
            DeliveryError::DuplicateOrder(_) => "duplicate_order",
            DeliveryError::NotAvailable(_) => "not_available",
            DeliveryError::NotFound(_) => "not_found",
            DeliveryError::RiderInactive(_) => "rider_inactive",
            DeliveryError::InvalidTransition { .. } => "invalid_transition",
            DeliveryError::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    OrderId,
    TrackingNumber,
    RiderEmail,
    RiderPhone,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate key: {0:?}")]
    DuplicateKey(UniqueKey),
}

impl From<StorageError> for DeliveryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => DeliveryError::StorageUnavailable(msg),
            StorageError::DuplicateKey(key) => {
                DeliveryError::StorageUnavailable(format!("unexpected duplicate {key:?}"))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        let message = err.to_string();
        match err {
            DeliveryError::Validation(_) => AppError::BadRequest(message),
            DeliveryError::DuplicateOrder(_)
            | DeliveryError::NotAvailable(_)
            | DeliveryError::InvalidTransition { .. } => AppError::Conflict(message),
            DeliveryError::NotFound(_) => AppError::NotFound(message),
            DeliveryError::RiderInactive(_) => AppError::Forbidden(message),
            DeliveryError::StorageUnavailable(_) => AppError::ServiceUnavailable(message),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            StorageError::DuplicateKey(key) => {
                AppError::Conflict(format!("{key:?} is already registered"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
