//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Infrastructure Errors**: database, storage and internal failures
/// - **Authentication Errors**: missing/expired sessions, bad credentials
/// - **Authorization Errors**: caller lacks the required role or shop access
/// - **Resource Errors**: requested resources not found
/// - **Business Logic Errors**: operations that violate rental rules
/// - **Validation Errors**: invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected failure that is not the caller's fault.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Local file storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Session token is missing, unknown, expired or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthorized,

    /// Sign-in failed. Unknown email, wrong password and suspended users
    /// are indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Authenticated, but not allowed to perform this operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// Requested resource does not exist or is not visible to the caller.
    ///
    /// Returns HTTP 404 Not Found. The string names the resource.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Request conflicts with existing state (duplicate email, serial number...).
    #[error("Conflict")]
    Conflict(String),

    /// Scooter cannot be booked or rented for the requested interval.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Scooter is not available for the requested period")]
    ScooterUnavailable,

    /// Rider is barred from renting, globally or at this shop.
    #[error("Rider is not allowed to rent at this shop")]
    RiderBlacklisted,

    /// Requested status change is not allowed from the current status.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Cannot move from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Onboarding activation code has expired.
    ///
    /// Returns HTTP 410 Gone.
    #[error("Onboarding code has expired")]
    OnboardingExpired,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Webhook URL failed validation.
    #[error("Invalid webhook URL")]
    InvalidWebhookUrl(String),
}

impl AppError {
    /// Status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::ScooterUnavailable => (StatusCode::CONFLICT, "scooter_unavailable"),
            AppError::RiderBlacklisted => (StatusCode::FORBIDDEN, "rider_blacklisted"),
            AppError::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
            }
            AppError::OnboardingExpired => (StatusCode::GONE, "onboarding_expired"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::InvalidWebhookUrl(_) => (StatusCode::BAD_REQUEST, "invalid_webhook_url"),
        }
    }

    /// Client-facing message. Infrastructure details are never exposed.
    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            AppError::Storage(_) => "File storage failed".to_string(),
            AppError::Conflict(msg)
            | AppError::InvalidRequest(msg)
            | AppError::InvalidWebhookUrl(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.client_message()
            }
        }));

        (status, body).into_response()
    }
}
