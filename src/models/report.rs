//! Shop report types.
//!
//! All reports cover a time window given by `from`/`to` query parameters,
//! defaulting to the last 30 days.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query string shared by all report endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Resolved report window, `from < to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReportWindow {
    pub const DEFAULT_DAYS: i64 = 30;
    pub const MAX_DAYS: i64 = 366;

    /// Resolve a window from optional bounds relative to `now`.
    pub fn resolve(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - Duration::days(Self::DEFAULT_DAYS));

        if from >= to {
            return Err("from must be before to".to_string());
        }
        if to - from > Duration::days(Self::MAX_DAYS) {
            return Err(format!(
                "report window cannot exceed {} days",
                Self::MAX_DAYS
            ));
        }

        Ok(Self { from, to })
    }

    pub fn seconds(&self) -> i64 {
        (self.to - self.from).num_seconds()
    }
}

/// Result of `get_booking_stats`.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub active: i64,
    pub completed: i64,
    pub cancelled: i64,
}

/// Result of `get_revenue_stats`.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RevenueStats {
    pub completed_bookings: i64,
    pub rental_cents: i64,
    pub insurance_cents: i64,
    pub total_cents: i64,
}

/// One row of `get_scooter_utilization`.
#[derive(Debug, Serialize)]
pub struct ScooterUtilization {
    pub scooter_id: Uuid,
    pub name: String,
    pub rented_seconds: i64,

    /// `rented_seconds / window seconds`, in [0, 1]
    pub utilization: f64,
}

/// One row of `get_top_scooters`.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopScooter {
    pub scooter_id: Uuid,
    pub name: String,
    pub completed_bookings: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse<T> {
    pub shop_id: Uuid,
    pub window: ReportWindow,
    pub data: T,
}
