//! Notifications written alongside booking changes.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        booking::{Booking, BookingStatus},
        notification::Notification,
    },
};

const LIST_LIMIT: i64 = 100;

/// Title and body for a booking status notification sent to the rider.
pub fn booking_status_message(status: BookingStatus, reason: Option<&str>) -> (String, String) {
    let (title, body) = match status {
        BookingStatus::Pending => ("Booking received", "Your booking is waiting for the shop to confirm it.".to_string()),
        BookingStatus::Confirmed => ("Booking confirmed", "The shop confirmed your booking.".to_string()),
        BookingStatus::Active => ("Ride started", "Your rental is now active. Ride safe!".to_string()),
        BookingStatus::Completed => ("Ride completed", "Thanks for riding with us.".to_string()),
        BookingStatus::Cancelled => (
            "Booking cancelled",
            match reason {
                Some(reason) => format!("Your booking was cancelled: {}", reason),
                None => "Your booking was cancelled.".to_string(),
            },
        ),
    };
    (title.to_string(), body)
}

/// Notify the rider that a booking moved to its current status.
pub async fn notify_booking_status<'e, E>(
    executor: E,
    booking: &Booking,
    reason: Option<&str>,
) -> Result<Uuid, AppError>
where
    E: PgExecutor<'e>,
{
    let (title, body) = booking_status_message(booking.status, reason);

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO notifications (user_id, kind, title, body, booking_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(booking.rider_id)
    .bind(format!("booking.{}", booking.status))
    .bind(title)
    .bind(body)
    .bind(booking.id)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// The user's notifications, newest first.
pub async fn list_notifications(
    pool: &DbPool,
    user_id: Uuid,
    unread_only: bool,
) -> Result<Vec<Notification>, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

/// Mark one notification read. Already-read notifications keep their `read_at`.
pub async fn mark_read(
    pool: &DbPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET read_at = COALESCE(read_at, NOW())
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(notification_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("notification"))
}

pub async fn mark_all_read(pool: &DbPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_message_includes_reason() {
        let (title, body) = booking_status_message(BookingStatus::Cancelled, Some("Scooter damaged"));
        assert_eq!(title, "Booking cancelled");
        assert!(body.ends_with("Scooter damaged"));

        let (_, body) = booking_status_message(BookingStatus::Cancelled, None);
        assert_eq!(body, "Your booking was cancelled.");
    }
}
