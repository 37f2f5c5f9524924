//! Blacklist handlers.
//!
//! Global entries are managed by admins under `/api/v1/admin/blacklist`;
//! shop entries by shop managers under `/api/v1/shops/{id}/blacklist`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        blacklist::{
            BlacklistCheckQuery, BlacklistCheckResponse, BlacklistEntry,
            CreateBlacklistEntryRequest,
        },
        shop::ShopAccess,
    },
    services::{blacklist_service, shop_service},
};

/// Add a global entry (admin).
///
/// # Request Body
///
/// ```json
/// { "rider_id": null, "document_number": "X1234567", "reason": "Stolen scooter" }
/// ```
///
/// At least one of `rider_id` and `document_number` is required.
pub async fn create_global_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateBlacklistEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;
    let entry = blacklist_service::create_entry(&pool, None, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_global_entries(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BlacklistEntry>>, AppError> {
    auth.require_admin()?;
    let entries = blacklist_service::list_entries(&pool, None).await?;
    Ok(Json(entries))
}

/// Add an entry scoped to one shop (manager).
pub async fn create_shop_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<CreateBlacklistEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;
    let entry = blacklist_service::create_entry(&pool, Some(shop_id), auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_shop_entries(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<BlacklistEntry>>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;
    let entries = blacklist_service::list_entries(&pool, Some(shop_id)).await?;
    Ok(Json(entries))
}

/// Delete an entry. Global entries need an admin, shop entries a manager
/// of that shop.
pub async fn delete_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let entry = blacklist_service::get_entry(&pool, entry_id).await?;

    match entry.shop_id {
        None => auth.require_admin()?,
        Some(shop_id) => {
            shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager)
                .await?;
        }
    }

    blacklist_service::delete_entry(&pool, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether a rider may rent at this shop (staff).
///
/// `GET /api/v1/shops/{id}/blacklist/check?rider_id=...`
///
/// Matches the rider's account and the document number on their profile.
pub async fn check_rider(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<BlacklistCheckQuery>,
) -> Result<Json<BlacklistCheckResponse>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Staff).await?;

    let document_number: Option<String> =
        sqlx::query_scalar("SELECT document_number FROM users WHERE id = $1")
            .bind(query.rider_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("rider"))?;

    let blacklisted = blacklist_service::is_rider_blacklisted(
        &pool,
        query.rider_id,
        document_number.as_deref(),
        Some(shop_id),
    )
    .await?;

    Ok(Json(BlacklistCheckResponse {
        rider_id: query.rider_id,
        blacklisted,
    }))
}
