//! Shop HTTP handlers.
//!
//! - POST /api/v1/shops - Register a shop (shop owners, admins)
//! - GET /api/v1/shops - List approved shops (public)
//! - GET /api/v1/shops/{id} - Approved shop detail (public)
//! - PATCH /api/v1/shops/{id} - Update contact fields (owner)
//! - GET /api/v1/me/shops - Shops the caller owns or staffs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        shop::{CreateShopRequest, Shop, ShopAccess, UpdateShopRequest},
        user::UserRole,
    },
    services::shop_service,
};

fn non_empty(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Register a new shop.
///
/// # Endpoint
///
/// `POST /api/v1/shops`
///
/// # Authorization
///
/// Caller must have the `shop_owner` or `admin` role. The caller becomes
/// the shop's owner.
///
/// # Response
///
/// - **201 Created**: the shop, with status `pending`
/// - **403**: caller is a rider
///
/// The shop stays invisible to riders until an admin approves it.
pub async fn create_shop(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateShopRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(auth.role, UserRole::ShopOwner | UserRole::Admin) {
        return Err(AppError::Forbidden);
    }

    let name = non_empty(&request.name, "name")?;

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        INSERT INTO shops (owner_id, name, description, phone, email, address)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(name)
    .bind(request.description)
    .bind(request.phone)
    .bind(request.email)
    .bind(request.address)
    .fetch_one(&pool)
    .await?;

    tracing::info!(shop_id = %shop.id, owner_id = %auth.user_id, "Shop registered");

    Ok((StatusCode::CREATED, Json(shop)))
}

/// List approved shops, alphabetically.
pub async fn list_shops(State(pool): State<DbPool>) -> Result<Json<Vec<Shop>>, AppError> {
    let shops =
        sqlx::query_as::<_, Shop>("SELECT * FROM shops WHERE status = 'approved' ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(shops))
}

/// Public shop detail.
///
/// Returns 404 for shops that are not approved, so pending or suspended
/// shops cannot be discovered by id.
pub async fn get_shop(
    State(pool): State<DbPool>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Shop>, AppError> {
    let shop = sqlx::query_as::<_, Shop>(
        "SELECT * FROM shops WHERE id = $1 AND status = 'approved'",
    )
    .bind(shop_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("shop"))?;

    Ok(Json(shop))
}

/// Update a shop's contact fields (owner).
///
/// Status is not editable here; see the admin moderation endpoint.
pub async fn update_shop(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<UpdateShopRequest>,
) -> Result<Json<Shop>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Owner).await?;

    let name = request
        .name
        .as_deref()
        .map(|name| non_empty(name, "name"))
        .transpose()?;

    let shop = sqlx::query_as::<_, Shop>(
        r#"
        UPDATE shops
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            phone = COALESCE($4, phone),
            email = COALESCE($5, email),
            address = COALESCE($6, address),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(name)
    .bind(request.description)
    .bind(request.phone)
    .bind(request.email)
    .bind(request.address)
    .fetch_one(&pool)
    .await?;

    Ok(Json(shop))
}

/// Shops the caller owns or is a staff member of, in any status.
pub async fn my_shops(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Shop>>, AppError> {
    let shops = sqlx::query_as::<_, Shop>(
        r#"
        SELECT s.* FROM shops s
        WHERE s.owner_id = $1
           OR EXISTS (SELECT 1 FROM shop_staff st WHERE st.shop_id = s.id AND st.user_id = $1)
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(shops))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(non_empty("   ", "name").is_err());
        assert_eq!(non_empty(" Harbour ", "name").unwrap(), "Harbour");
    }
}
