//! Onboarding session handlers.
//!
//! - POST /api/v1/shops/{id}/onboarding-sessions - Create a session (staff)
//! - GET /api/v1/shops/{id}/onboarding-sessions - List a shop's sessions (staff)
//! - POST /api/v1/onboarding/activate - Redeem an activation code (rider)
//! - GET /api/v1/onboarding-sessions/{id} - Session detail (rider or staff)
//! - POST /api/v1/onboarding-sessions/{id}/steps - Complete the current step (rider)
//! - POST /api/v1/onboarding-sessions/{id}/cancel - Cancel (staff)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::onboarding::{
        ActivateOnboardingRequest, AdvanceOnboardingRequest, CreateOnboardingSessionRequest,
        OnboardingSession,
    },
    services::onboarding_service,
    state::AppState,
};

/// Create an onboarding session.
///
/// # Request Body
///
/// ```json
/// { "booking_id": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// The body may be omitted entirely for walk-in riders.
///
/// # Response (201 Created)
///
/// ```json
/// {
///   "id": "...",
///   "activation_code": "042917",
///   "qr_payload": "http://localhost:3000/onboarding/activate?code=042917",
///   "status": "pending",
///   "current_step": "identity_verification",
///   "expires_at": "2025-12-21T10:15:00Z"
/// }
/// ```
pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    request: Option<Json<CreateOnboardingSessionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session =
        onboarding_service::create_session(&state.pool, &state.config, &auth, shop_id, request)
            .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<OnboardingSession>>, AppError> {
    let sessions = onboarding_service::list_sessions(&state.pool, &auth, shop_id).await?;
    Ok(Json(sessions))
}

/// Redeem an activation code.
///
/// # Errors
///
/// - **400**: code is not 6 digits
/// - **404**: no pending session with this code
/// - **410**: `onboarding_expired`
pub async fn activate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ActivateOnboardingRequest>,
) -> Result<Json<OnboardingSession>, AppError> {
    let session = onboarding_service::activate(&state.pool, &auth, &request.code).await?;
    Ok(Json(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<OnboardingSession>, AppError> {
    let session = onboarding_service::get_session(&state.pool, &auth, session_id).await?;
    Ok(Json(session))
}

/// Complete the session's current step.
///
/// `step` must name the current step; out-of-order completions return
/// **422** `invalid_transition`.
pub async fn advance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AdvanceOnboardingRequest>,
) -> Result<Json<OnboardingSession>, AppError> {
    let session = onboarding_service::advance(&state.pool, &auth, session_id, request).await?;
    Ok(Json(session))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<OnboardingSession>, AppError> {
    let session = onboarding_service::cancel(&state.pool, &auth, session_id).await?;
    Ok(Json(session))
}
