//! Platform administration handlers. Every handler requires the admin role.
//!
//! - GET /api/v1/admin/users?role=
//! - PATCH /api/v1/admin/users/{id}
//! - POST /api/v1/admin/users/{id}/revoke-sessions
//! - GET /api/v1/admin/shops?status=
//! - POST /api/v1/admin/shops/{id}/moderate

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        shop::{ModerateShopRequest, Shop, ShopListQuery, ShopStatus},
        user::{AdminUpdateUserRequest, User, UserListQuery, UserResponse},
    },
    services::auth_service,
};

#[derive(Debug, Serialize)]
pub struct RevokedSessionsResponse {
    pub revoked: u64,
}

/// Moderation cannot send a shop back to `pending`.
pub fn check_moderation_status(status: ShopStatus) -> Result<(), AppError> {
    match status {
        ShopStatus::Approved | ShopStatus::Suspended | ShopStatus::Rejected => Ok(()),
        ShopStatus::Pending => Err(AppError::InvalidRequest(
            "status must be approved, suspended or rejected".to_string(),
        )),
    }
}

pub async fn list_users(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    auth.require_admin()?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::user_role IS NULL OR role = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(query.role)
    .fetch_all(&pool)
    .await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Change a user's role or suspension.
///
/// # Request Body
///
/// ```json
/// { "role": "shop_owner", "is_suspended": true }
/// ```
///
/// # Behavior
///
/// - Admins cannot suspend themselves (**400**)
/// - Suspending a user revokes all of their sessions
pub async fn update_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth.require_admin()?;

    if user_id == auth.user_id && request.is_suspended == Some(true) {
        return Err(AppError::InvalidRequest(
            "Admins cannot suspend themselves".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET role = COALESCE($2, role),
            is_suspended = COALESCE($3, is_suspended),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(request.role)
    .bind(request.is_suspended)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("user"))?;

    if user.is_suspended {
        let revoked = auth_service::revoke_all_sessions(&pool, user.id).await?;
        tracing::info!(user_id = %user.id, revoked, "User suspended");
    }

    Ok(Json(user.into()))
}

pub async fn revoke_sessions(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RevokedSessionsResponse>, AppError> {
    auth.require_admin()?;
    let revoked = auth_service::revoke_all_sessions(&pool, user_id).await?;
    Ok(Json(RevokedSessionsResponse { revoked }))
}

/// Shops in any status, oldest pending first when filtering by `pending`.
pub async fn list_shops(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ShopListQuery>,
) -> Result<Json<Vec<Shop>>, AppError> {
    auth.require_admin()?;

    let shops = sqlx::query_as::<_, Shop>(
        r#"
        SELECT * FROM shops
        WHERE ($1::shop_status IS NULL OR status = $1)
        ORDER BY created_at
        "#,
    )
    .bind(query.status)
    .fetch_all(&pool)
    .await?;

    Ok(Json(shops))
}

/// Approve, suspend or reject a shop.
///
/// ```json
/// { "status": "approved", "note": "Documents verified" }
/// ```
///
/// Suspended and rejected shops drop out of public listings and cannot
/// take new bookings.
pub async fn moderate_shop(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<ModerateShopRequest>,
) -> Result<Json<Shop>, AppError> {
    auth.require_admin()?;
    check_moderation_status(request.status)?;

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops
        SET status = $2, moderation_note = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(request.status)
    .bind(request.note)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("shop"))?;

    tracing::info!(
        shop_id = %shop.id,
        status = ?shop.status,
        admin_id = %auth.user_id,
        "Shop moderated"
    );

    Ok(Json(shop))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_not_a_moderation_outcome() {
        assert!(check_moderation_status(ShopStatus::Pending).is_err());
        assert!(check_moderation_status(ShopStatus::Approved).is_ok());
        assert!(check_moderation_status(ShopStatus::Rejected).is_ok());
    }
}
