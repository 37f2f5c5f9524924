//! Insurance policy models.
//!
//! Shops offer optional insurance on bookings, charged per started day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct InsurancePolicy {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub daily_rate_cents: i64,

    /// Maximum damage amount covered
    pub coverage_cents: i64,

    /// Inactive policies cannot be attached to new bookings
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInsurancePolicyRequest {
    pub name: String,
    pub description: Option<String>,
    pub daily_rate_cents: i64,
    pub coverage_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInsurancePolicyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub daily_rate_cents: Option<i64>,
    pub coverage_cents: Option<i64>,
    pub is_active: Option<bool>,
}
