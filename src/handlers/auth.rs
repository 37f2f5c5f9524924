//! Sign-up, sign-in and profile handlers.
//!
//! - POST /api/v1/auth/sign-up
//! - POST /api/v1/auth/sign-in
//! - POST /api/v1/auth/sign-out
//! - GET /api/v1/auth/me
//! - PATCH /api/v1/auth/me

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{SignInRequest, SignUpRequest, UpdateProfileRequest, UserResponse},
    services::auth_service,
    state::AppState,
};

/// Create an account.
///
/// # Endpoint
///
/// `POST /api/v1/auth/sign-up` (public)
///
/// # Request Body
///
/// ```json
/// {
///   "email": "rider@example.com",
///   "password": "correct horse",
///   "full_name": "Ada Rider",
///   "phone": "+15550100",
///   "role": "rider"
/// }
/// ```
///
/// `role` is optional and may be `rider` or `shop_owner`.
///
/// # Response
///
/// - **201 Created**: `{ token, expires_at, user }`
/// - **400**: invalid email/password or requested admin role
/// - **409**: email already registered
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = auth_service::sign_up(&state.pool, &state.config, request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Sign in with email and password.
///
/// # Endpoint
///
/// `POST /api/v1/auth/sign-in` (public)
///
/// # Response
///
/// - **200 OK**: `{ token, expires_at, user }`
/// - **401**: `invalid_credentials`
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = auth_service::sign_in(&state.pool, &state.config, request).await?;
    Ok(Json(session))
}

/// Revoke the session used for this request.
pub async fn sign_out(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth_service::sign_out(&pool, auth.session_id).await?;
    tracing::info!(user_id = %auth.user_id, email = %auth.email, "User signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service::get_user(&pool, auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Update the caller's profile.
///
/// # Request Body
///
/// ```json
/// { "full_name": "Ada R.", "phone": null, "document_number": "X1234567" }
/// ```
///
/// `document_number` is matched against shop blacklists at booking time.
pub async fn update_profile(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service::update_profile(&pool, auth.user_id, request).await?;
    Ok(Json(user.into()))
}
