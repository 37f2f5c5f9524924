//! Scooter fleet handlers.
//!
//! - GET /api/v1/scooters - Public discovery of available scooters
//! - GET /api/v1/scooters/{id} - Scooter detail (public, approved shops)
//! - GET /api/v1/shops/{id}/scooters - Full fleet of a shop (staff)
//! - POST /api/v1/shops/{id}/scooters - Add a scooter (staff)
//! - PATCH /api/v1/scooters/{id} - Update a scooter (staff)
//! - DELETE /api/v1/scooters/{id} - Retire a scooter (staff)

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        scooter::{
            CreateScooterRequest, Scooter, ScooterSearchQuery, ScooterStatus,
            UpdateScooterRequest, validate_rates,
        },
        shop::ShopAccess,
    },
    services::shop_service,
};

/// Reject manual changes that only bookings may make.
pub fn check_manual_status(
    current: ScooterStatus,
    requested: Option<ScooterStatus>,
) -> Result<(), AppError> {
    match requested {
        None => Ok(()),
        Some(next) if next == current => Ok(()),
        Some(ScooterStatus::Rented) => Err(AppError::InvalidRequest(
            "Scooters become rented only through an active booking".to_string(),
        )),
        Some(_) if current == ScooterStatus::Rented => {
            Err(AppError::Conflict(
                "Scooter is rented; complete or cancel the booking first".to_string(),
            ))
        }
        Some(_) => Ok(()),
    }
}

fn map_serial_conflict(e: sqlx::Error) -> AppError {
    if db::is_unique_violation(&e) {
        AppError::Conflict("Serial number is already registered".to_string())
    } else {
        AppError::Database(e)
    }
}

async fn ensure_branch_in_shop<'e, E>(
    executor: E,
    branch_id: Option<Uuid>,
    shop_id: Uuid,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let Some(branch_id) = branch_id else {
        return Ok(());
    };

    let belongs: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1 AND shop_id = $2)",
    )
    .bind(branch_id)
    .bind(shop_id)
    .fetch_one(executor)
    .await?;

    if belongs {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Branch does not belong to this shop".to_string(),
        ))
    }
}

/// Search available scooters.
///
/// # Endpoint
///
/// `GET /api/v1/scooters?shop_id=&branch_id=&max_hourly_rate_cents=&min_battery=&limit=&offset=`
///
/// # Behavior
///
/// Only `available` scooters of `approved` shops are returned, cheapest
/// first. `limit` defaults to 20 and is capped at 100.
pub async fn search_scooters(
    State(pool): State<DbPool>,
    Query(query): Query<ScooterSearchQuery>,
) -> Result<Json<Vec<Scooter>>, AppError> {
    let scooters = sqlx::query_as::<_, Scooter>(
        r#"
        SELECT sc.* FROM scooters sc
        JOIN shops s ON s.id = sc.shop_id
        WHERE sc.status = 'available'
          AND s.status = 'approved'
          AND ($1::uuid IS NULL OR sc.shop_id = $1)
          AND ($2::uuid IS NULL OR sc.branch_id = $2)
          AND ($3::bigint IS NULL OR sc.hourly_rate_cents <= $3)
          AND ($4::smallint IS NULL OR sc.battery_level >= $4)
        ORDER BY sc.hourly_rate_cents, sc.battery_level DESC, sc.id
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(query.shop_id)
    .bind(query.branch_id)
    .bind(query.max_hourly_rate_cents)
    .bind(query.min_battery)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Json(scooters))
}

pub async fn get_scooter(
    State(pool): State<DbPool>,
    Path(scooter_id): Path<Uuid>,
) -> Result<Json<Scooter>, AppError> {
    let scooter = sqlx::query_as::<_, Scooter>(
        r#"
        SELECT sc.* FROM scooters sc
        JOIN shops s ON s.id = sc.shop_id
        WHERE sc.id = $1 AND s.status = 'approved' AND sc.status <> 'retired'
        "#,
    )
    .bind(scooter_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("scooter"))?;

    Ok(Json(scooter))
}

/// Every scooter of a shop, retired ones included.
pub async fn list_shop_scooters(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Vec<Scooter>>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Staff).await?;

    let scooters =
        sqlx::query_as::<_, Scooter>("SELECT * FROM scooters WHERE shop_id = $1 ORDER BY name")
            .bind(shop_id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(scooters))
}

/// Add a scooter to a shop's fleet.
///
/// # Errors
///
/// - **400**: rates not positive, battery outside 0..=100, foreign branch
/// - **409**: serial number already registered
pub async fn create_scooter(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<CreateScooterRequest>,
) -> Result<impl IntoResponse, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Staff).await?;

    if request.name.trim().is_empty() || request.serial_number.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "name and serial_number are required".to_string(),
        ));
    }
    validate_rates(
        Some(request.battery_level),
        Some(request.hourly_rate_cents),
        request.daily_rate_cents,
    )
    .map_err(AppError::InvalidRequest)?;
    ensure_branch_in_shop(&pool, request.branch_id, shop_id).await?;

    let scooter = sqlx::query_as::<_, Scooter>(
        r#"
        INSERT INTO scooters (
            shop_id, branch_id, name, model, serial_number, battery_level,
            hourly_rate_cents, daily_rate_cents, image_url
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(request.branch_id)
    .bind(request.name.trim())
    .bind(request.model.trim())
    .bind(request.serial_number.trim())
    .bind(request.battery_level)
    .bind(request.hourly_rate_cents)
    .bind(request.daily_rate_cents)
    .bind(request.image_url)
    .fetch_one(&pool)
    .await
    .map_err(map_serial_conflict)?;

    tracing::info!(scooter_id = %scooter.id, shop_id = %shop_id, "Scooter added");

    Ok((StatusCode::CREATED, Json(scooter)))
}

/// Update a scooter. Absent fields are unchanged; `rented` cannot be set.
pub async fn update_scooter(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(scooter_id): Path<Uuid>,
    Json(request): Json<UpdateScooterRequest>,
) -> Result<Json<Scooter>, AppError> {
    let mut tx = pool.begin().await?;

    let current =
        sqlx::query_as::<_, Scooter>("SELECT * FROM scooters WHERE id = $1 FOR UPDATE")
            .bind(scooter_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("scooter"))?;

    shop_service::require_shop_access(&mut *tx, &auth, current.shop_id, ShopAccess::Staff)
        .await?;

    validate_rates(
        request.battery_level,
        request.hourly_rate_cents,
        request.daily_rate_cents,
    )
    .map_err(AppError::InvalidRequest)?;
    check_manual_status(current.status, request.status)?;
    ensure_branch_in_shop(&mut *tx, request.branch_id, current.shop_id).await?;

    let scooter = sqlx::query_as::<_, Scooter>(
        r#"
        UPDATE scooters
        SET name = COALESCE($2, name),
            model = COALESCE($3, model),
            branch_id = COALESCE($4, branch_id),
            battery_level = COALESCE($5, battery_level),
            hourly_rate_cents = COALESCE($6, hourly_rate_cents),
            daily_rate_cents = COALESCE($7, daily_rate_cents),
            status = COALESCE($8, status),
            image_url = COALESCE($9, image_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(scooter_id)
    .bind(request.name)
    .bind(request.model)
    .bind(request.branch_id)
    .bind(request.battery_level)
    .bind(request.hourly_rate_cents)
    .bind(request.daily_rate_cents)
    .bind(request.status)
    .bind(request.image_url)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(scooter))
}

/// Retire a scooter (soft delete). Existing bookings keep their reference.
///
/// # Errors
///
/// - **409**: the scooter is currently rented
pub async fn retire_scooter(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(scooter_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = pool.begin().await?;

    let current =
        sqlx::query_as::<_, Scooter>("SELECT * FROM scooters WHERE id = $1 FOR UPDATE")
            .bind(scooter_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("scooter"))?;

    shop_service::require_shop_access(&mut *tx, &auth, current.shop_id, ShopAccess::Staff)
        .await?;
    check_manual_status(current.status, Some(ScooterStatus::Retired))?;

    sqlx::query("UPDATE scooters SET status = 'retired', updated_at = NOW() WHERE id = $1")
        .bind(scooter_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(scooter_id = %scooter_id, "Scooter retired");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::UserRole, test_support};

    #[test]
    fn rented_cannot_be_set_manually() {
        let err = check_manual_status(ScooterStatus::Available, Some(ScooterStatus::Rented))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn rented_scooter_cannot_be_retired() {
        let err =
            check_manual_status(ScooterStatus::Rented, Some(ScooterStatus::Retired)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn other_changes_pass() {
        assert!(check_manual_status(ScooterStatus::Available, None).is_ok());
        assert!(
            check_manual_status(ScooterStatus::Available, Some(ScooterStatus::Maintenance)).is_ok()
        );
        assert!(check_manual_status(ScooterStatus::Rented, None).is_ok());
    }

    #[test]
    fn repeating_the_current_status_is_accepted() {
        assert!(check_manual_status(ScooterStatus::Rented, Some(ScooterStatus::Rented)).is_ok());
        assert!(
            check_manual_status(ScooterStatus::Retired, Some(ScooterStatus::Retired)).is_ok()
        );
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn update_and_retire_run_on_a_single_connection() {
        let Some(pool) = test_support::pool(1).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;
        let scooter_id = test_support::scooter(&pool, shop_id).await;

        let Json(updated) = update_scooter(
            State(pool.clone()),
            Extension(owner.clone()),
            Path(scooter_id),
            Json(UpdateScooterRequest {
                name: None,
                model: None,
                branch_id: None,
                battery_level: Some(40),
                hourly_rate_cents: None,
                daily_rate_cents: None,
                status: Some(ScooterStatus::Maintenance),
                image_url: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.battery_level, 40);
        assert_eq!(updated.status, ScooterStatus::Maintenance);

        let status = retire_scooter(State(pool.clone()), Extension(owner), Path(scooter_id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
