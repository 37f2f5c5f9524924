//! Rider context persistence and reconciliation.
//!
//! The reducer lives in `models::rider_context`; this service loads the
//! stored state, applies events and writes the result back. Reads reconcile
//! the stored phase with the rider's bookings so the server stays the
//! authority on whether a rental is running.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        booking::BookingStatus,
        rider_context::{RiderContext, RiderEvent, RiderPhase, RiderState},
    },
};

async fn load_for_update(conn: &mut PgConnection, user_id: Uuid) -> Result<RiderState, AppError> {
    // Make sure a row exists so it can be locked
    sqlx::query("INSERT INTO rider_contexts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let context = sqlx::query_as::<_, RiderContext>(
        "SELECT * FROM rider_contexts WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(context.state())
}

async fn store(
    conn: &mut PgConnection,
    user_id: Uuid,
    state: RiderState,
) -> Result<RiderContext, AppError> {
    let context = sqlx::query_as::<_, RiderContext>(
        r#"
        UPDATE rider_contexts
        SET phase = $2, booking_id = $3, updated_at = NOW()
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(state.phase)
    .bind(state.booking_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(context)
}

/// Apply a rental event without failing the surrounding booking change
/// when the stored context disagrees with it (e.g. a rider with two
/// overlapping rentals). The context is forced to match the booking.
pub async fn apply_rental_event(
    conn: &mut PgConnection,
    user_id: Uuid,
    event: RiderEvent,
) -> Result<RiderContext, AppError> {
    let current = load_for_update(conn, user_id).await?;

    let next = match current.apply(event) {
        Ok(next) => next,
        Err(_) => match event {
            RiderEvent::RentalStarted { booking_id } => RiderState {
                phase: RiderPhase::Active,
                booking_id: Some(booking_id),
            },
            RiderEvent::RentalEnded { booking_id } if current.booking_id == Some(booking_id) => {
                RiderState {
                    phase: RiderPhase::PostRental,
                    booking_id: Some(booking_id),
                }
            }
            // Ending a rental the context is not tracking leaves it alone
            _ => current,
        },
    };

    store(conn, user_id, next).await
}

/// Decide the reconciled state from the stored one and the rider's bookings.
///
/// - A running booking always wins: the context is `active` on it
/// - An `active` context whose booking is no longer running becomes `post_rental`
pub fn reconcile(
    stored: RiderState,
    active_booking: Option<Uuid>,
    tracked_booking_status: Option<BookingStatus>,
) -> RiderState {
    if let Some(booking_id) = active_booking {
        return RiderState {
            phase: RiderPhase::Active,
            booking_id: Some(booking_id),
        };
    }

    if stored.phase == RiderPhase::Active
        && tracked_booking_status != Some(BookingStatus::Active)
    {
        return RiderState {
            phase: RiderPhase::PostRental,
            booking_id: stored.booking_id,
        };
    }

    stored
}

/// Lock the stored context and reconcile it with the rider's bookings.
async fn load_reconciled(conn: &mut PgConnection, user_id: Uuid) -> Result<RiderState, AppError> {
    let stored = load_for_update(conn, user_id).await?;

    let active_booking: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM bookings
        WHERE rider_id = $1 AND status = 'active'
        ORDER BY start_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let tracked_status: Option<BookingStatus> = match stored.booking_id {
        Some(booking_id) => {
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };

    Ok(reconcile(stored, active_booking, tracked_status))
}

/// Load the rider's context, reconciling it with their bookings.
pub async fn get_context(pool: &DbPool, user_id: Uuid) -> Result<RiderContext, AppError> {
    let mut tx = pool.begin().await?;
    let reconciled = load_reconciled(&mut tx, user_id).await?;
    let context = store(&mut tx, user_id, reconciled).await?;
    tx.commit().await?;

    Ok(context)
}

/// Apply a client event in its own transaction.
///
/// The event is applied to the reconciled state, so a context still
/// showing a finished rental as `active` accepts `dismiss`.
pub async fn apply_client_event(
    pool: &DbPool,
    user_id: Uuid,
    event: RiderEvent,
) -> Result<RiderContext, AppError> {
    let mut tx = pool.begin().await?;
    let current = load_reconciled(&mut tx, user_id).await?;
    let next = current.apply(event)?;

    tracing::debug!(
        user_id = %user_id,
        from = current.phase.as_str(),
        to = next.phase.as_str(),
        "Rider context updated"
    );

    let context = store(&mut tx, user_id, next).await?;
    tx.commit().await?;
    Ok(context)
}
