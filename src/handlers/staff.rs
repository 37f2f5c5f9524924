//! Shop staff membership handlers.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    middleware::auth::AuthContext,
    models::shop::{AddStaffRequest, ShopAccess, ShopStaffMember},
    services::{auth_service, shop_service},
};

/// Add an existing user to the shop's staff.
///
/// # Endpoint
///
/// `POST /api/v1/shops/{id}/staff` (owner)
///
/// # Request Body
///
/// ```json
/// { "email": "crew@example.com", "staff_role": "manager" }
/// ```
///
/// # Errors
///
/// - **404**: no user with that email
/// - **400**: the user is the shop owner
/// - **409**: the user is already a staff member
pub async fn add_staff(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<AddStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    let shop = shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Owner).await?;

    let email = auth_service::normalize_email(&request.email);
    let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    if user_id == shop.owner_id {
        return Err(AppError::InvalidRequest(
            "The shop owner cannot be added as staff".to_string(),
        ));
    }

    sqlx::query("INSERT INTO shop_staff (shop_id, user_id, staff_role) VALUES ($1, $2, $3)")
        .bind(shop_id)
        .bind(user_id)
        .bind(request.staff_role)
        .execute(&pool)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("User is already a staff member".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

    let member = fetch_member(&pool, shop_id, user_id)
        .await?
        .ok_or(AppError::NotFound("staff member"))?;

    tracing::info!(shop_id = %shop_id, user_id = %user_id, "Staff member added");

    Ok((StatusCode::CREATED, Json(member)))
}

/// List staff members (manager).
pub async fn list_staff(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<ShopStaffMember>>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;

    let members = sqlx::query_as::<_, ShopStaffMember>(
        r#"
        SELECT st.shop_id, st.user_id, u.email, u.full_name, st.staff_role, st.created_at
        FROM shop_staff st
        JOIN users u ON u.id = st.user_id
        WHERE st.shop_id = $1
        ORDER BY st.created_at
        "#,
    )
    .bind(shop_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(members))
}

/// Remove a staff member (owner).
pub async fn remove_staff(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((shop_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Owner).await?;

    let result = sqlx::query("DELETE FROM shop_staff WHERE shop_id = $1 AND user_id = $2")
        .bind(shop_id)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("staff member"));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_member(
    pool: &DbPool,
    shop_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ShopStaffMember>, AppError> {
    let member = sqlx::query_as::<_, ShopStaffMember>(
        r#"
        SELECT st.shop_id, st.user_id, u.email, u.full_name, st.staff_role, st.created_at
        FROM shop_staff st
        JOIN users u ON u.id = st.user_id
        WHERE st.shop_id = $1 AND st.user_id = $2
        "#,
    )
    .bind(shop_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(member)
}
