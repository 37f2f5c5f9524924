//! Scooter fleet models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational status of a scooter.
///
/// `Rented` is only ever set by a booking becoming active; `Retired` is the
/// soft-delete state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "scooter_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScooterStatus {
    Available,
    Rented,
    Maintenance,
    Retired,
}

/// Represents a scooter record from the database.
///
/// # Pricing
///
/// Rates are stored in cents. When `daily_rate_cents` is set, each full day
/// of a booking is charged at the daily rate and the remaining hours are
/// capped at one daily rate.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Scooter {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub name: String,
    pub model: String,
    pub serial_number: String,

    /// Percent, 0..=100
    pub battery_level: i16,

    pub hourly_rate_cents: i64,
    pub daily_rate_cents: Option<i64>,
    pub status: ScooterStatus,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/shops/{id}/scooters`.
///
/// ```json
/// {
///   "name": "Blue 7",
///   "model": "Segway Ninebot Max",
///   "serial_number": "SN-0007",
///   "hourly_rate_cents": 600,
///   "daily_rate_cents": 3500,
///   "branch_id": null
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateScooterRequest {
    pub name: String,
    pub model: String,
    pub serial_number: String,
    pub branch_id: Option<Uuid>,
    #[serde(default = "default_battery_level")]
    pub battery_level: i16,
    pub hourly_rate_cents: i64,
    pub daily_rate_cents: Option<i64>,
    pub image_url: Option<String>,
}

fn default_battery_level() -> i16 {
    100
}

/// Request body for `PATCH /api/v1/scooters/{id}`. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateScooterRequest {
    pub name: Option<String>,
    pub model: Option<String>,
    pub branch_id: Option<Uuid>,
    pub battery_level: Option<i16>,
    pub hourly_rate_cents: Option<i64>,
    pub daily_rate_cents: Option<i64>,
    pub status: Option<ScooterStatus>,
    pub image_url: Option<String>,
}

/// Query string for `GET /api/v1/scooters`.
#[derive(Debug, Default, Deserialize)]
pub struct ScooterSearchQuery {
    pub shop_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub max_hourly_rate_cents: Option<i64>,
    pub min_battery: Option<i16>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ScooterSearchQuery {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    /// Page size clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Validate the numeric fields shared by create and update.
pub fn validate_rates(
    battery_level: Option<i16>,
    hourly_rate_cents: Option<i64>,
    daily_rate_cents: Option<i64>,
) -> Result<(), String> {
    if let Some(level) = battery_level {
        if !(0..=100).contains(&level) {
            return Err("battery_level must be between 0 and 100".to_string());
        }
    }
    if hourly_rate_cents.is_some_and(|rate| rate <= 0) {
        return Err("hourly_rate_cents must be positive".to_string());
    }
    if daily_rate_cents.is_some_and(|rate| rate <= 0) {
        return Err("daily_rate_cents must be positive".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_limit_is_clamped() {
        let query = ScooterSearchQuery::default();
        assert_eq!(query.limit(), 20);

        let query = ScooterSearchQuery {
            limit: Some(1000),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn rates_must_be_positive() {
        assert!(validate_rates(Some(50), Some(500), Some(3000)).is_ok());
        assert!(validate_rates(Some(101), None, None).is_err());
        assert!(validate_rates(None, Some(0), None).is_err());
        assert!(validate_rates(None, None, Some(-1)).is_err());
    }
}
