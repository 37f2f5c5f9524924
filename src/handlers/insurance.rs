//! Insurance policy handlers.

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
        insurance::{CreateInsurancePolicyRequest, InsurancePolicy, UpdateInsurancePolicyRequest},
        shop::ShopAccess,
    },
    services::shop_service,
};

fn validate_amounts(
    daily_rate_cents: Option<i64>,
    coverage_cents: Option<i64>,
) -> Result<(), AppError> {
    if daily_rate_cents.is_some_and(|v| v < 0) || coverage_cents.is_some_and(|v| v < 0) {
        return Err(AppError::InvalidRequest(
            "daily_rate_cents and coverage_cents cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Active policies a rider can attach to a booking.
///
/// `GET /api/v1/shops/{id}/insurance-policies` (public)
pub async fn list_policies(
    State(pool): State<DbPool>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<InsurancePolicy>>, AppError> {
    let policies = sqlx::query_as::<_, InsurancePolicy>(
        "SELECT * FROM insurance_policies WHERE shop_id = $1 AND is_active = true ORDER BY daily_rate_cents",
    )
    .bind(shop_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(policies))
}

/// Create a policy (manager).
///
/// ```json
/// { "name": "Basic", "description": "Covers scratches", "daily_rate_cents": 300, "coverage_cents": 50000 }
/// ```
pub async fn create_policy(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<CreateInsurancePolicyRequest>,
) -> Result<impl IntoResponse, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;

    if request.name.trim().is_empty() {
        return Err(AppError::InvalidRequest("name cannot be empty".to_string()));
    }
    validate_amounts(Some(request.daily_rate_cents), Some(request.coverage_cents))?;

    let policy = sqlx::query_as::<_, InsurancePolicy>(
        r#"
        INSERT INTO insurance_policies (shop_id, name, description, daily_rate_cents, coverage_cents)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(request.name.trim())
    .bind(request.description)
    .bind(request.daily_rate_cents)
    .bind(request.coverage_cents)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(policy)))
}

/// Update a policy (manager). Setting `is_active` to false withdraws it
/// from new bookings; existing bookings keep their price.
pub async fn update_policy(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((shop_id, policy_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateInsurancePolicyRequest>,
) -> Result<Json<InsurancePolicy>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Manager).await?;
    validate_amounts(request.daily_rate_cents, request.coverage_cents)?;

    let policy = sqlx::query_as::<_, InsurancePolicy>(
        r#"
        UPDATE insurance_policies
        SET name = COALESCE($3, name),
            description = COALESCE($4, description),
            daily_rate_cents = COALESCE($5, daily_rate_cents),
            coverage_cents = COALESCE($6, coverage_cents),
            is_active = COALESCE($7, is_active)
        WHERE id = $1 AND shop_id = $2
        RETURNING *
        "#,
    )
    .bind(policy_id)
    .bind(shop_id)
    .bind(request.name)
    .bind(request.description)
    .bind(request.daily_rate_cents)
    .bind(request.coverage_cents)
    .bind(request.is_active)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("insurance policy"))?;

    Ok(Json(policy))
}
