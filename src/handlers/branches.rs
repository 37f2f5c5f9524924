//! Branch (pickup location) handlers.

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
    models::shop::{Branch, CreateBranchRequest, ShopAccess, validate_coordinates},
    services::shop_service,
};

/// List a shop's branches.
///
/// `GET /api/v1/shops/{id}/branches` (public)
pub async fn list_branches(
    State(pool): State<DbPool>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<Branch>>, AppError> {
    let branches = sqlx::query_as::<_, Branch>(
        r#"
        SELECT b.* FROM branches b
        JOIN shops s ON s.id = b.shop_id
        WHERE b.shop_id = $1 AND s.status = 'approved'
        ORDER BY b.name
        "#,
    )
    .bind(shop_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(branches))
}

/// Add a branch (manager).
///
/// # Request Body
///
/// ```json
/// { "name": "Pier", "address": "1 Pier Road", "latitude": 51.5, "longitude": -0.12 }
/// ```
pub async fn create_branch(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<CreateBranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;

    if request.name.trim().is_empty() || request.address.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "name and address are required".to_string(),
        ));
    }
    validate_coordinates(request.latitude, request.longitude).map_err(AppError::InvalidRequest)?;

    let branch = sqlx::query_as::<_, Branch>(
        r#"
        INSERT INTO branches (shop_id, name, address, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(request.name.trim())
    .bind(request.address.trim())
    .bind(request.latitude)
    .bind(request.longitude)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(branch)))
}

/// Remove a branch (manager). Scooters at the branch keep existing
/// without a branch.
pub async fn delete_branch(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((shop_id, branch_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;

    let result = sqlx::query("DELETE FROM branches WHERE id = $1 AND shop_id = $2")
        .bind(branch_id)
        .bind(shop_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("branch"));
    }

    Ok(StatusCode::NO_CONTENT)
}
