//! Booking data models and API request/response types.
//!
//! This module defines:
//! - `Booking`: Database entity representing a scooter reservation
//! - `BookingStatus`: Lifecycle states and the allowed transitions between them
//! - Request types for creating bookings and changing their status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a booking.
///
/// ```text
/// pending ──► confirmed ──► active ──► completed
///    │            │            │
///    └────────────┴────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Staying in the same status is not a transition; callers treat it as a no-op.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Active)
                | (Confirmed, Cancelled)
                | (Active, Completed)
                | (Active, Cancelled)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a booking record from the database.
///
/// # Database Table
///
/// Maps to the `bookings` table. Each booking:
/// - Belongs to one rider and one scooter
/// - Copies the scooter's `shop_id` so shop queries don't need a join
/// - Stores prices in cents, computed once at creation time
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub scooter_id: Uuid,
    pub shop_id: Uuid,
    pub insurance_policy_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: BookingStatus,

    /// Scooter rental price
    pub rental_cents: i64,

    /// Insurance price (0 without a policy)
    pub insurance_cents: i64,

    /// `rental_cents + insurance_cents`
    pub total_cents: i64,

    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/bookings`.
///
/// # JSON Example
///
/// ```json
/// {
///   "scooter_id": "550e8400-e29b-41d4-a716-446655440000",
///   "start_at": "2025-12-21T10:00:00Z",
///   "end_at": "2025-12-21T13:30:00Z",
///   "insurance_policy_id": null,
///   "notes": "Helmet size M please"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub scooter_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub insurance_policy_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Request body for `POST /api/v1/bookings/{id}/status`.
///
/// ```json
/// { "status": "cancelled", "reason": "Plans changed" }
/// ```
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    pub reason: Option<String>,
}

/// Query string for shop booking listings.
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Active));
        assert!(BookingStatus::Active.can_transition_to(BookingStatus::Completed));
    }

    #[test]
    fn cancellation_is_allowed_until_terminal() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Active.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Cancelled));
    }

    #[test]
    fn skipping_and_reversing_are_rejected() {
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Active));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Completed));
        assert!(!BookingStatus::Active.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Active.can_transition_to(BookingStatus::Active));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");

        let parsed: UpdateBookingStatusRequest =
            serde_json::from_str(r#"{"status": "active"}"#).unwrap();
        assert_eq!(parsed.status, BookingStatus::Active);
        assert!(parsed.reason.is_none());
    }
}
