//! Onboarding session models.
//!
//! An onboarding session is the short-lived verification workflow a rider
//! goes through at pickup. Staff create it, the rider redeems its 6-digit
//! activation code (typed in or scanned from the QR payload) and then walks
//! through the steps in order.
//!
//! # Flow
//!
//! 1. Staff create a session: status `pending`, step `identity_verification`
//! 2. Rider activates it with the code before `expires_at`: status `active`
//! 3. Rider advances `identity_verification → document_upload → agreement → done`
//! 4. Reaching `done` marks the session `completed`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "onboarding_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Pending,
    Active,
    Completed,
    Expired,
    Cancelled,
}

impl OnboardingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingStatus::Pending => "pending",
            OnboardingStatus::Active => "active",
            OnboardingStatus::Completed => "completed",
            OnboardingStatus::Expired => "expired",
            OnboardingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "onboarding_step", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    IdentityVerification,
    DocumentUpload,
    Agreement,
    Done,
}

impl OnboardingStep {
    /// The step that follows this one, `None` once done.
    pub fn next(self) -> Option<OnboardingStep> {
        match self {
            OnboardingStep::IdentityVerification => Some(OnboardingStep::DocumentUpload),
            OnboardingStep::DocumentUpload => Some(OnboardingStep::Agreement),
            OnboardingStep::Agreement => Some(OnboardingStep::Done),
            OnboardingStep::Done => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingStep::IdentityVerification => "identity_verification",
            OnboardingStep::DocumentUpload => "document_upload",
            OnboardingStep::Agreement => "agreement",
            OnboardingStep::Done => "done",
        }
    }
}

/// Represents an onboarding session record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OnboardingSession {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub booking_id: Option<Uuid>,

    /// Set when a rider activates the session
    pub rider_id: Option<Uuid>,

    /// Six digits, zero-padded
    pub activation_code: String,

    /// URL encoded into the QR code shown to the rider
    pub qr_payload: String,

    pub status: OnboardingStatus,
    pub current_step: OnboardingStep,

    /// Uploaded identity document, required to pass `document_upload`
    pub document_url: Option<String>,

    pub expires_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/shops/{id}/onboarding-sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateOnboardingSessionRequest {
    pub booking_id: Option<Uuid>,
}

/// Request body for `POST /api/v1/onboarding/activate`.
///
/// ```json
/// { "code": "042917" }
/// ```
#[derive(Debug, Deserialize)]
pub struct ActivateOnboardingRequest {
    pub code: String,
}

/// Request body for `POST /api/v1/onboarding-sessions/{id}/steps`.
///
/// ```json
/// { "step": "document_upload", "document_url": "http://localhost:3000/uploads/documents/....pdf" }
/// ```
///
/// `step` is the step being completed and must equal the session's current
/// step; the session then moves on to the following one.
#[derive(Debug, Deserialize)]
pub struct AdvanceOnboardingRequest {
    pub step: OnboardingStep,
    pub document_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_advance_in_order() {
        let mut step = OnboardingStep::IdentityVerification;
        let mut seen = vec![step];
        while let Some(next) = step.next() {
            seen.push(next);
            step = next;
        }
        assert_eq!(
            seen,
            vec![
                OnboardingStep::IdentityVerification,
                OnboardingStep::DocumentUpload,
                OnboardingStep::Agreement,
                OnboardingStep::Done,
            ]
        );
    }
}
