//! Booking service - Core business logic for scooter reservations.
//!
//! This service handles:
//! - Availability checks (scooter state, shop approval, overlapping bookings)
//! - Blacklist enforcement
//! - Pricing
//! - Status transitions and their side effects on scooters, rider context
//!   and notifications
//!
//! # Atomicity Guarantees
//!
//! Creation and every status change run inside one PostgreSQL transaction.
//! The scooter row (on create) or the booking row (on status change) is
//! locked with `FOR UPDATE`, so two concurrent requests for the same
//! scooter or booking are serialized.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, BookingStatus, CreateBookingRequest, UpdateBookingStatusRequest},
        insurance::InsurancePolicy,
        rider_context::RiderEvent,
        scooter::{Scooter, ScooterStatus},
        shop::{ShopAccess, ShopStatus},
        webhook::BookingEventType,
    },
    services::{
        blacklist_service, notification_service, rider_context_service, shop_service,
        webhook_service,
    },
};

/// How far in the past a booking may start (clock skew, slow forms).
const START_GRACE_MINUTES: i64 = 5;

/// Longest bookable interval.
const MAX_BOOKING_DAYS: i64 = 30;

/// Started hours of a duration, at least one.
pub fn billable_hours(duration: Duration) -> i64 {
    let seconds = duration.num_seconds().max(0);
    ((seconds + 3599) / 3600).max(1)
}

/// Started days of a duration, at least one.
pub fn billable_days(duration: Duration) -> i64 {
    let seconds = duration.num_seconds().max(0);
    ((seconds + 86_399) / 86_400).max(1)
}

/// Rental price in cents.
///
/// Without a daily rate every started hour is charged. With one, each full
/// day costs the daily rate and the remaining hours are capped at one daily
/// rate. The result never exceeds the plain hourly price.
pub fn rental_price(
    hourly_rate_cents: i64,
    daily_rate_cents: Option<i64>,
    duration: Duration,
) -> i64 {
    let hours = billable_hours(duration);
    let hourly_total = hours * hourly_rate_cents;

    match daily_rate_cents {
        None => hourly_total,
        Some(daily) => {
            let full_days = hours / 24;
            let remaining_hours = hours % 24;
            let with_days = full_days * daily + (remaining_hours * hourly_rate_cents).min(daily);
            with_days.min(hourly_total)
        }
    }
}

/// Insurance price in cents: daily rate per started day.
pub fn insurance_price(daily_rate_cents: i64, duration: Duration) -> i64 {
    daily_rate_cents * billable_days(duration)
}

/// Validate a requested booking window against `now`.
pub fn validate_window(
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if end_at <= start_at {
        return Err(AppError::InvalidRequest(
            "end_at must be after start_at".to_string(),
        ));
    }
    if start_at < now - Duration::minutes(START_GRACE_MINUTES) {
        return Err(AppError::InvalidRequest(
            "start_at cannot be in the past".to_string(),
        ));
    }
    if end_at - start_at > Duration::days(MAX_BOOKING_DAYS) {
        return Err(AppError::InvalidRequest(format!(
            "Bookings cannot be longer than {} days",
            MAX_BOOKING_DAYS
        )));
    }
    Ok(())
}

/// Create a booking (`create_booking`).
///
/// # Process
///
/// 1. Validate the window
/// 2. Start database transaction and lock the scooter row
/// 3. Check shop approval and scooter state
/// 4. Check the rider blacklist (global and shop)
/// 5. Check for overlapping pending/confirmed/active bookings
/// 6. Price the booking (rental + optional insurance)
/// 7. Insert as `pending`, notify the rider, commit
/// 8. Deliver `booking.created` to shop webhooks in the background
///
/// # Errors
///
/// - `InvalidRequest`: bad window or insurance policy
/// - `NotFound`: scooter does not exist
/// - `ScooterUnavailable`: shop not approved, scooter out of service, or overlap
/// - `RiderBlacklisted`: rider barred globally or at this shop
pub async fn create_booking(
    pool: &DbPool,
    rider_id: Uuid,
    request: CreateBookingRequest,
) -> Result<Booking, AppError> {
    validate_window(request.start_at, request.end_at, Utc::now())?;

    let mut tx = pool.begin().await?;

    // FOR UPDATE serializes bookings for the same scooter
    let scooter = sqlx::query_as::<_, Scooter>("SELECT * FROM scooters WHERE id = $1 FOR UPDATE")
        .bind(request.scooter_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("scooter"))?;

    let shop_status: ShopStatus = sqlx::query_scalar("SELECT status FROM shops WHERE id = $1")
        .bind(scooter.shop_id)
        .fetch_one(&mut *tx)
        .await?;

    if shop_status != ShopStatus::Approved
        || matches!(
            scooter.status,
            ScooterStatus::Maintenance | ScooterStatus::Retired
        )
    {
        return Err(AppError::ScooterUnavailable);
    }

    let document_number: Option<String> =
        sqlx::query_scalar("SELECT document_number FROM users WHERE id = $1")
            .bind(rider_id)
            .fetch_one(&mut *tx)
            .await?;

    if blacklist_service::is_rider_blacklisted(
        &mut *tx,
        rider_id,
        document_number.as_deref(),
        Some(scooter.shop_id),
    )
    .await?
    {
        tracing::info!(rider_id = %rider_id, shop_id = %scooter.shop_id, "Blacklisted rider refused");
        return Err(AppError::RiderBlacklisted);
    }

    let overlapping: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE scooter_id = $1
              AND status IN ('pending', 'confirmed', 'active')
              AND start_at < $3
              AND end_at > $2
        )
        "#,
    )
    .bind(scooter.id)
    .bind(request.start_at)
    .bind(request.end_at)
    .fetch_one(&mut *tx)
    .await?;

    if overlapping {
        return Err(AppError::ScooterUnavailable);
    }

    let duration = request.end_at - request.start_at;

    let insurance_cents = match request.insurance_policy_id {
        Some(policy_id) => {
            let policy = sqlx::query_as::<_, InsurancePolicy>(
                "SELECT * FROM insurance_policies WHERE id = $1 AND shop_id = $2 AND is_active = true",
            )
            .bind(policy_id)
            .bind(scooter.shop_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::InvalidRequest(
                    "Insurance policy is not offered for this scooter".to_string(),
                )
            })?;
            insurance_price(policy.daily_rate_cents, duration)
        }
        None => 0,
    };

    let rental_cents = rental_price(scooter.hourly_rate_cents, scooter.daily_rate_cents, duration);

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            rider_id,
            scooter_id,
            shop_id,
            insurance_policy_id,
            start_at,
            end_at,
            status,
            rental_cents,
            insurance_cents,
            total_cents,
            notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(rider_id)
    .bind(scooter.id)
    .bind(scooter.shop_id)
    .bind(request.insurance_policy_id)
    .bind(request.start_at)
    .bind(request.end_at)
    .bind(rental_cents)
    .bind(insurance_cents)
    .bind(rental_cents + insurance_cents)
    .bind(request.notes)
    .fetch_one(&mut *tx)
    .await?;

    notification_service::notify_booking_status(&mut *tx, &booking, None).await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        scooter_id = %booking.scooter_id,
        total_cents = booking.total_cents,
        "Booking created"
    );

    webhook_service::dispatch_booking_event(
        pool.clone(),
        booking.clone(),
        BookingEventType::Created,
        None,
    );

    Ok(booking)
}

/// Whether the caller acting only as the booking's rider may request `to`.
pub fn rider_may_request(from: BookingStatus, to: BookingStatus) -> bool {
    to == BookingStatus::Cancelled
        && matches!(from, BookingStatus::Pending | BookingStatus::Confirmed)
}

/// Change a booking's status.
///
/// # Process
///
/// 1. Lock the booking row
/// 2. Authorize: shop staff may request any allowed transition, the rider
///    may only cancel a pending or confirmed booking
/// 3. Same status: return the booking unchanged (idempotent retry)
/// 4. Validate the transition
/// 5. Side effects: `active` rents the scooter, leaving `active` frees it;
///    rider context and rider notification are updated in the same transaction
/// 6. Commit, then deliver `booking.status_changed` to shop webhooks
pub async fn update_status(
    pool: &DbPool,
    auth: &AuthContext,
    booking_id: Uuid,
    request: UpdateBookingStatusRequest,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("booking"))?;

    let from = booking.status;
    let to = request.status;

    let is_staff =
        shop_service::has_shop_access(&mut *tx, auth, booking.shop_id, ShopAccess::Staff).await?;
    if !is_staff {
        if booking.rider_id != auth.user_id {
            return Err(AppError::NotFound("booking"));
        }
        if from != to && !rider_may_request(from, to) {
            return Err(AppError::Forbidden);
        }
    }

    if from == to {
        return Ok(booking);
    }

    if !from.can_transition_to(to) {
        return Err(AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    if to == BookingStatus::Active {
        let scooter_status: ScooterStatus =
            sqlx::query_scalar("SELECT status FROM scooters WHERE id = $1 FOR UPDATE")
                .bind(booking.scooter_id)
                .fetch_one(&mut *tx)
                .await?;

        if scooter_status != ScooterStatus::Available {
            return Err(AppError::ScooterUnavailable);
        }

        sqlx::query("UPDATE scooters SET status = 'rented', updated_at = NOW() WHERE id = $1")
            .bind(booking.scooter_id)
            .execute(&mut *tx)
            .await?;
    }

    if from == BookingStatus::Active {
        sqlx::query(
            "UPDATE scooters SET status = 'available', updated_at = NOW() WHERE id = $1 AND status = 'rented'",
        )
        .bind(booking.scooter_id)
        .execute(&mut *tx)
        .await?;
    }

    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let cancel_reason = if to == BookingStatus::Cancelled {
        reason.clone()
    } else {
        None
    };

    let updated = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = $2,
            cancel_reason = COALESCE($3, cancel_reason),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(to)
    .bind(cancel_reason)
    .fetch_one(&mut *tx)
    .await?;

    if to == BookingStatus::Active {
        rider_context_service::apply_rental_event(
            &mut tx,
            updated.rider_id,
            RiderEvent::RentalStarted {
                booking_id: updated.id,
            },
        )
        .await?;
    } else if from == BookingStatus::Active {
        rider_context_service::apply_rental_event(
            &mut tx,
            updated.rider_id,
            RiderEvent::RentalEnded {
                booking_id: updated.id,
            },
        )
        .await?;
    }

    notification_service::notify_booking_status(&mut *tx, &updated, reason.as_deref()).await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %updated.id,
        from = from.as_str(),
        to = to.as_str(),
        by = %auth.user_id,
        "Booking status changed"
    );

    webhook_service::dispatch_booking_event(
        pool.clone(),
        updated.clone(),
        BookingEventType::StatusChanged,
        Some(from),
    );

    Ok(updated)
}

/// Get a booking visible to the caller (its rider or shop staff).
///
/// Bookings the caller cannot see are reported as not found.
pub async fn get_booking(
    pool: &DbPool,
    auth: &AuthContext,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("booking"))?;

    if booking.rider_id == auth.user_id
        || shop_service::has_shop_access(pool, auth, booking.shop_id, ShopAccess::Staff).await?
    {
        Ok(booking)
    } else {
        Err(AppError::NotFound("booking"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{rider_context::RiderPhase, user::UserRole},
        test_support,
    };
    use chrono::TimeZone;

    #[test]
    fn partial_hours_are_rounded_up() {
        assert_eq!(billable_hours(Duration::minutes(1)), 1);
        assert_eq!(billable_hours(Duration::minutes(60)), 1);
        assert_eq!(billable_hours(Duration::minutes(61)), 2);
        assert_eq!(billable_hours(Duration::zero()), 1);
    }

    #[test]
    fn hourly_only_pricing() {
        assert_eq!(rental_price(500, None, Duration::minutes(150)), 1500);
        assert_eq!(rental_price(500, None, Duration::hours(30)), 15_000);
    }

    #[test]
    fn daily_rate_caps_each_day() {
        // 26 hours: one day + 2 hours
        assert_eq!(rental_price(500, Some(3000), Duration::hours(26)), 3000 + 1000);
        // 30 hours: one day + 6 hours, remainder capped at one daily rate
        assert_eq!(rental_price(600, Some(3000), Duration::hours(30)), 3000 + 3000);
        // Exactly two days
        assert_eq!(rental_price(600, Some(3000), Duration::hours(48)), 6000);
    }

    #[test]
    fn daily_rate_never_costs_more_than_hourly() {
        // Daily rate above 24 hourly rates: hourly price wins
        assert_eq!(rental_price(100, Some(5000), Duration::hours(25)), 2500);
        assert_eq!(rental_price(500, Some(3000), Duration::hours(2)), 1000);
    }

    #[test]
    fn insurance_charged_per_started_day() {
        assert_eq!(insurance_price(300, Duration::hours(3)), 300);
        assert_eq!(insurance_price(300, Duration::hours(24)), 300);
        assert_eq!(insurance_price(300, Duration::hours(25)), 600);
        assert_eq!(insurance_price(0, Duration::hours(25)), 0);
    }

    #[test]
    fn window_validation() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        assert!(validate_window(now, now + Duration::hours(2), now).is_ok());
        assert!(validate_window(now - Duration::minutes(3), now + Duration::hours(1), now).is_ok());

        assert!(validate_window(now, now, now).is_err());
        assert!(validate_window(now + Duration::hours(2), now, now).is_err());
        assert!(validate_window(now - Duration::hours(1), now + Duration::hours(1), now).is_err());
        assert!(validate_window(now, now + Duration::days(31), now).is_err());
    }

    #[test]
    fn riders_may_only_cancel_before_pickup() {
        assert!(rider_may_request(BookingStatus::Pending, BookingStatus::Cancelled));
        assert!(rider_may_request(BookingStatus::Confirmed, BookingStatus::Cancelled));
        assert!(!rider_may_request(BookingStatus::Active, BookingStatus::Cancelled));
        assert!(!rider_may_request(BookingStatus::Pending, BookingStatus::Confirmed));
        assert!(!rider_may_request(BookingStatus::Confirmed, BookingStatus::Active));
    }

    async fn scooter_status(pool: &DbPool, scooter_id: Uuid) -> ScooterStatus {
        sqlx::query_scalar("SELECT status FROM scooters WHERE id = $1")
            .bind(scooter_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn notification_count(pool: &DbPool, booking_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn move_to(status: BookingStatus) -> UpdateBookingStatusRequest {
        UpdateBookingStatusRequest {
            status,
            reason: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn overlapping_bookings_are_refused() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;
        let scooter_id = test_support::scooter(&pool, shop_id).await;

        let first = test_support::booking(&pool, &rider, scooter_id, 1, 3).await;

        let overlapping = create_booking(
            &pool,
            rider.user_id,
            CreateBookingRequest {
                scooter_id,
                start_at: test_support::hours_from_now(2),
                end_at: test_support::hours_from_now(4),
                insurance_policy_id: None,
                notes: None,
            },
        )
        .await;
        assert!(matches!(overlapping, Err(AppError::ScooterUnavailable)));

        // Intervals are half-open: starting when the other ends is fine
        let adjacent = test_support::booking(&pool, &rider, scooter_id, 3, 5).await;
        assert_eq!(adjacent.status, BookingStatus::Pending);

        // A cancelled booking no longer holds its slot
        update_status(&pool, &rider, first.id, move_to(BookingStatus::Cancelled))
            .await
            .unwrap();
        let rebooked = test_support::booking(&pool, &rider, scooter_id, 2, 3).await;
        assert_eq!(rebooked.rental_cents, 500);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn rental_lifecycle_rents_and_frees_the_scooter() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;
        let scooter_id = test_support::scooter(&pool, shop_id).await;
        let booking = test_support::booking(&pool, &rider, scooter_id, 1, 3).await;
        assert_eq!(notification_count(&pool, booking.id).await, 1);

        update_status(&pool, &owner, booking.id, move_to(BookingStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(scooter_status(&pool, scooter_id).await, ScooterStatus::Available);

        let active = update_status(&pool, &owner, booking.id, move_to(BookingStatus::Active))
            .await
            .unwrap();
        assert_eq!(scooter_status(&pool, scooter_id).await, ScooterStatus::Rented);
        assert_eq!(notification_count(&pool, booking.id).await, 3);

        // Repeating the current status changes nothing
        let repeated = update_status(&pool, &owner, booking.id, move_to(BookingStatus::Active))
            .await
            .unwrap();
        assert_eq!(repeated.status, BookingStatus::Active);
        assert_eq!(repeated.updated_at, active.updated_at);
        assert_eq!(notification_count(&pool, booking.id).await, 3);

        update_status(&pool, &owner, booking.id, move_to(BookingStatus::Completed))
            .await
            .unwrap();
        assert_eq!(scooter_status(&pool, scooter_id).await, ScooterStatus::Available);
        assert_eq!(notification_count(&pool, booking.id).await, 4);

        let context = rider_context_service::get_context(&pool, rider.user_id)
            .await
            .unwrap();
        assert_eq!(context.phase, RiderPhase::PostRental);
        assert_eq!(context.booking_id, Some(booking.id));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn rider_status_requests_are_limited() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let stranger = test_support::user(&pool, UserRole::Rider).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;
        let scooter_id = test_support::scooter(&pool, shop_id).await;
        let booking = test_support::booking(&pool, &rider, scooter_id, 1, 3).await;

        let confirm = update_status(&pool, &rider, booking.id, move_to(BookingStatus::Confirmed)).await;
        assert!(matches!(confirm, Err(AppError::Forbidden)));

        let foreign = update_status(&pool, &stranger, booking.id, move_to(BookingStatus::Cancelled)).await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));

        let cancelled = update_status(&pool, &rider, booking.id, move_to(BookingStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_transitions_fit_a_small_pool() {
        let Some(pool) = test_support::pool(2).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;

        let mut bookings = Vec::new();
        for _ in 0..4 {
            let scooter_id = test_support::scooter(&pool, shop_id).await;
            bookings.push(test_support::booking(&pool, &rider, scooter_id, 1, 2).await);
        }

        let started = std::time::Instant::now();
        let handles: Vec<_> = bookings
            .into_iter()
            .map(|booking| {
                let pool = pool.clone();
                let owner = owner.clone();
                tokio::spawn(async move {
                    update_status(&pool, &owner, booking.id, move_to(BookingStatus::Confirmed)).await
                })
            })
            .collect();

        for handle in handles {
            let booking = handle.await.unwrap().unwrap();
            assert_eq!(booking.status, BookingStatus::Confirmed);
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
