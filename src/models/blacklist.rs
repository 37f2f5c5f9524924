//! Blacklist entry models.
//!
//! An entry bars a rider from renting. It matches either the rider's account
//! or an identity document number, and is scoped to one shop or, when
//! `shop_id` is NULL, to the whole marketplace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct BlacklistEntry {
    pub id: Uuid,

    /// NULL for global entries
    pub shop_id: Option<Uuid>,

    pub rider_id: Option<Uuid>,
    pub document_number: Option<String>,
    pub reason: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating a blacklist entry (global or shop-scoped).
///
/// At least one of `rider_id` and `document_number` is required.
///
/// ```json
/// { "rider_id": "550e8400-...", "reason": "Unpaid damage" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBlacklistEntryRequest {
    pub rider_id: Option<Uuid>,
    pub document_number: Option<String>,
    pub reason: String,
}

/// Query string for `GET /api/v1/shops/{id}/blacklist/check`.
#[derive(Debug, Deserialize)]
pub struct BlacklistCheckQuery {
    pub rider_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BlacklistCheckResponse {
    pub rider_id: Uuid,
    pub blacklisted: bool,
}
