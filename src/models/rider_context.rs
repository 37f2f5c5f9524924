//! Rider context: where a rider currently is in the rental journey.
//!
//! The context is a small state machine stored per rider:
//!
//! ```text
//!            start_looking              rental_started
//!   idle ────────────────► looking ─────────────────► active
//!    ▲  ◄────────────────     │                         │
//!    │     stop_looking       │ rental_started          │ rental_ended
//!    │                        ▼                         ▼
//!    └──────── dismiss ─── post_rental ◄────────────────┘
//! ```
//!
//! Rental events come from booking transitions, never from clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "rider_phase", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiderPhase {
    Idle,
    Looking,
    Active,
    PostRental,
}

impl RiderPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RiderPhase::Idle => "idle",
            RiderPhase::Looking => "looking",
            RiderPhase::Active => "active",
            RiderPhase::PostRental => "post_rental",
        }
    }
}

/// Event applied to a rider context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderEvent {
    StartLooking,
    StopLooking,
    RentalStarted { booking_id: Uuid },
    RentalEnded { booking_id: Uuid },
    Dismiss,
}

impl RiderEvent {
    fn name(&self) -> &'static str {
        match self {
            RiderEvent::StartLooking => "start_looking",
            RiderEvent::StopLooking => "stop_looking",
            RiderEvent::RentalStarted { .. } => "rental_started",
            RiderEvent::RentalEnded { .. } => "rental_ended",
            RiderEvent::Dismiss => "dismiss",
        }
    }
}

/// Events a client may send. Rental events are server-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRiderEvent {
    StartLooking,
    StopLooking,
    Dismiss,
}

impl From<ClientRiderEvent> for RiderEvent {
    fn from(event: ClientRiderEvent) -> Self {
        match event {
            ClientRiderEvent::StartLooking => RiderEvent::StartLooking,
            ClientRiderEvent::StopLooking => RiderEvent::StopLooking,
            ClientRiderEvent::Dismiss => RiderEvent::Dismiss,
        }
    }
}

/// Request body for `POST /api/v1/rider/context/events`.
///
/// ```json
/// { "event": "start_looking" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RiderEventRequest {
    pub event: ClientRiderEvent,
}

/// Phase plus the booking it refers to (set in `active` and `post_rental`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiderState {
    pub phase: RiderPhase,
    pub booking_id: Option<Uuid>,
}

impl Default for RiderState {
    fn default() -> Self {
        Self {
            phase: RiderPhase::Idle,
            booking_id: None,
        }
    }
}

impl RiderState {
    /// Apply an event, returning the next state.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when the event is not accepted in the current phase.
    pub fn apply(self, event: RiderEvent) -> Result<RiderState, AppError> {
        use RiderPhase::*;

        let next = match (self.phase, event) {
            (Idle, RiderEvent::StartLooking) | (PostRental, RiderEvent::StartLooking) => {
                RiderState {
                    phase: Looking,
                    booking_id: None,
                }
            }
            (Looking, RiderEvent::StopLooking) | (PostRental, RiderEvent::Dismiss) => {
                RiderState::default()
            }
            (Idle | Looking | PostRental, RiderEvent::RentalStarted { booking_id }) => RiderState {
                phase: Active,
                booking_id: Some(booking_id),
            },
            (Active, RiderEvent::RentalEnded { booking_id })
                if self.booking_id == Some(booking_id) =>
            {
                RiderState {
                    phase: PostRental,
                    booking_id: Some(booking_id),
                }
            }
            (phase, event) => {
                return Err(AppError::InvalidTransition {
                    from: phase.as_str().to_string(),
                    to: event.name().to_string(),
                });
            }
        };

        Ok(next)
    }
}

/// Stored rider context row.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct RiderContext {
    pub user_id: Uuid,
    pub phase: RiderPhase,
    pub booking_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl RiderContext {
    pub fn state(&self) -> RiderState {
        RiderState {
            phase: self.phase,
            booking_id: self.booking_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(phase: RiderPhase, booking_id: Option<Uuid>) -> RiderState {
        RiderState { phase, booking_id }
    }

    #[test]
    fn full_rental_journey() {
        let booking_id = Uuid::new_v4();

        let s = RiderState::default()
            .apply(RiderEvent::StartLooking)
            .unwrap();
        assert_eq!(s, state(RiderPhase::Looking, None));

        let s = s.apply(RiderEvent::RentalStarted { booking_id }).unwrap();
        assert_eq!(s, state(RiderPhase::Active, Some(booking_id)));

        let s = s.apply(RiderEvent::RentalEnded { booking_id }).unwrap();
        assert_eq!(s, state(RiderPhase::PostRental, Some(booking_id)));

        let s = s.apply(RiderEvent::Dismiss).unwrap();
        assert_eq!(s, RiderState::default());
    }

    #[test]
    fn rental_can_start_without_looking() {
        let booking_id = Uuid::new_v4();
        let s = RiderState::default()
            .apply(RiderEvent::RentalStarted { booking_id })
            .unwrap();
        assert_eq!(s.phase, RiderPhase::Active);
    }

    #[test]
    fn ending_a_different_booking_is_rejected() {
        let s = state(RiderPhase::Active, Some(Uuid::new_v4()));
        let err = s
            .apply(RiderEvent::RentalEnded {
                booking_id: Uuid::new_v4(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn client_events_cannot_interrupt_a_rental() {
        let s = state(RiderPhase::Active, Some(Uuid::new_v4()));
        assert!(s.apply(RiderEvent::StartLooking).is_err());
        assert!(s.apply(RiderEvent::Dismiss).is_err());
        assert!(s.apply(RiderEvent::StopLooking).is_err());
    }

    #[test]
    fn post_rental_can_start_looking_again() {
        let s = state(RiderPhase::PostRental, Some(Uuid::new_v4()));
        let s = s.apply(RiderEvent::StartLooking).unwrap();
        assert_eq!(s, state(RiderPhase::Looking, None));
    }

    #[test]
    fn client_payload_rejects_rental_events() {
        let ok: RiderEventRequest = serde_json::from_str(r#"{"event": "dismiss"}"#).unwrap();
        assert_eq!(ok.event, ClientRiderEvent::Dismiss);

        let err = serde_json::from_str::<RiderEventRequest>(r#"{"event": "rental_started"}"#);
        assert!(err.is_err());
    }
}
