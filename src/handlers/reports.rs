//! Shop report handlers (manager access).
//!
//! All endpoints take `?from=&to=` (RFC 3339, default last 30 days).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        report::{
            BookingStats, ReportQuery, ReportResponse, ReportWindow, RevenueStats,
            ScooterUtilization, TopScooter,
        },
        shop::ShopAccess,
    },
    services::{report_service, shop_service},
};

async fn authorize(
    pool: &DbPool,
    auth: &AuthContext,
    shop_id: Uuid,
    query: &ReportQuery,
) -> Result<ReportWindow, AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Manager).await?;
    ReportWindow::resolve(query.from, query.to, Utc::now()).map_err(AppError::InvalidRequest)
}

/// `GET /api/v1/shops/{id}/reports/bookings`
///
/// ```json
/// {
///   "shop_id": "...",
///   "window": { "from": "2025-11-21T00:00:00Z", "to": "2025-12-21T00:00:00Z" },
///   "data": { "total": 42, "pending": 3, "confirmed": 5, "active": 1, "completed": 30, "cancelled": 3 }
/// }
/// ```
pub async fn booking_stats(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse<BookingStats>>, AppError> {
    let window = authorize(&pool, &auth, shop_id, &query).await?;
    let data = report_service::booking_stats(&pool, shop_id, &window).await?;
    Ok(Json(ReportResponse {
        shop_id,
        window,
        data,
    }))
}

/// `GET /api/v1/shops/{id}/reports/revenue`
pub async fn revenue_stats(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse<RevenueStats>>, AppError> {
    let window = authorize(&pool, &auth, shop_id, &query).await?;
    let data = report_service::revenue_stats(&pool, shop_id, &window).await?;
    Ok(Json(ReportResponse {
        shop_id,
        window,
        data,
    }))
}

/// `GET /api/v1/shops/{id}/reports/utilization`
pub async fn scooter_utilization(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse<Vec<ScooterUtilization>>>, AppError> {
    let window = authorize(&pool, &auth, shop_id, &query).await?;
    let data = report_service::scooter_utilization(&pool, shop_id, &window).await?;
    Ok(Json(ReportResponse {
        shop_id,
        window,
        data,
    }))
}

/// `GET /api/v1/shops/{id}/reports/top-scooters?limit=5`
pub async fn top_scooters(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse<Vec<TopScooter>>>, AppError> {
    let window = authorize(&pool, &auth, shop_id, &query).await?;
    let data = report_service::top_scooters(&pool, shop_id, &window, query.limit).await?;
    Ok(Json(ReportResponse {
        shop_id,
        window,
        data,
    }))
}
