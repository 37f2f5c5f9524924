//! Booking HTTP handlers.
//!
//! - POST /api/v1/bookings - Book a scooter (rider)
//! - GET /api/v1/bookings - The caller's own bookings
//! - GET /api/v1/bookings/{id} - Booking detail (rider or shop staff)
//! - POST /api/v1/bookings/{id}/status - Move a booking through its lifecycle
//! - GET /api/v1/shops/{id}/bookings - A shop's bookings (staff)

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
        booking::{Booking, BookingListQuery, CreateBookingRequest, UpdateBookingStatusRequest},
        shop::ShopAccess,
    },
    services::{booking_service, shop_service},
};

/// Book a scooter.
///
/// # Endpoint
///
/// `POST /api/v1/bookings`
///
/// # Request Body
///
/// ```json
/// {
///   "scooter_id": "550e8400-e29b-41d4-a716-446655440000",
///   "start_at": "2025-12-21T10:00:00Z",
///   "end_at": "2025-12-21T13:30:00Z",
///   "insurance_policy_id": null
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the `pending` booking with its computed price
/// - **400**: invalid window or insurance policy
/// - **403**: `rider_blacklisted`
/// - **404**: scooter not found
/// - **409**: `scooter_unavailable` (out of service or overlapping booking)
///
/// The scooter row is locked for the duration of the check-and-insert, so
/// two riders booking the same interval cannot both succeed.
pub async fn create_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = booking_service::create_booking(&pool, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// The caller's bookings, newest first.
pub async fn list_my_bookings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE rider_id = $1 AND ($2::booking_status IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(auth.user_id)
    .bind(query.status)
    .fetch_all(&pool)
    .await?;

    Ok(Json(bookings))
}

/// A shop's bookings with an optional `?status=` filter (staff).
pub async fn list_shop_bookings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    shop_service::require_shop_access(&pool, &auth, shop_id, ShopAccess::Staff).await?;

    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT * FROM bookings
        WHERE shop_id = $1 AND ($2::booking_status IS NULL OR status = $2)
        ORDER BY start_at DESC
        LIMIT 200
        "#,
    )
    .bind(shop_id)
    .bind(query.status)
    .fetch_all(&pool)
    .await?;

    Ok(Json(bookings))
}

pub async fn get_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = booking_service::get_booking(&pool, &auth, booking_id).await?;
    Ok(Json(booking))
}

/// Change a booking's status.
///
/// # Endpoint
///
/// `POST /api/v1/bookings/{id}/status`
///
/// # Request Body
///
/// ```json
/// { "status": "active" }
/// ```
///
/// # Authorization
///
/// Riders may cancel their own `pending` or `confirmed` bookings. Every
/// other change needs staff access to the booking's shop.
///
/// # Response
///
/// - **200 OK**: the updated booking (unchanged if already in that status)
/// - **409**: `scooter_unavailable` when activating a scooter that is not available
/// - **422**: `invalid_transition`
pub async fn update_booking_status(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = booking_service::update_status(&pool, &auth, booking_id, request).await?;
    Ok(Json(booking))
}
