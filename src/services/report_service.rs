//! Shop reports: booking counts, revenue, scooter utilization and top scooters.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        booking::BookingStatus,
        report::{BookingStats, ReportWindow, RevenueStats, ScooterUtilization, TopScooter},
    },
};

pub const DEFAULT_TOP_LIMIT: i64 = 5;
pub const MAX_TOP_LIMIT: i64 = 50;

pub fn top_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_TOP_LIMIT)
        .clamp(1, MAX_TOP_LIMIT)
}

/// Fold per-status counts into a `BookingStats`.
pub fn tally(counts: &[(BookingStatus, i64)]) -> BookingStats {
    let mut stats = BookingStats::default();
    for &(status, count) in counts {
        match status {
            BookingStatus::Pending => stats.pending += count,
            BookingStatus::Confirmed => stats.confirmed += count,
            BookingStatus::Active => stats.active += count,
            BookingStatus::Completed => stats.completed += count,
            BookingStatus::Cancelled => stats.cancelled += count,
        }
        stats.total += count;
    }
    stats
}

/// Seconds of `window` covered by the union of `intervals`.
///
/// Overlapping intervals count once, and parts outside the window are dropped.
pub fn rented_seconds(
    intervals: &[(DateTime<Utc>, DateTime<Utc>)],
    window: &ReportWindow,
) -> i64 {
    let mut clipped: Vec<(DateTime<Utc>, DateTime<Utc>)> = intervals
        .iter()
        .map(|&(start, end)| (start.max(window.from), end.min(window.to)))
        .filter(|(start, end)| start < end)
        .collect();
    clipped.sort();

    let mut total = 0;
    let mut current: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for (start, end) in clipped {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                total += (cur_end - cur_start).num_seconds();
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }

    if let Some((start, end)) = current {
        total += (end - start).num_seconds();
    }

    total
}

/// Count bookings created in the window, by status.
pub async fn booking_stats(
    pool: &DbPool,
    shop_id: Uuid,
    window: &ReportWindow,
) -> Result<BookingStats, AppError> {
    let counts = sqlx::query_as::<_, (BookingStatus, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM bookings
        WHERE shop_id = $1 AND created_at >= $2 AND created_at < $3
        GROUP BY status
        "#,
    )
    .bind(shop_id)
    .bind(window.from)
    .bind(window.to)
    .fetch_all(pool)
    .await?;

    Ok(tally(&counts))
}

/// Revenue from bookings completed with `end_at` in the window.
pub async fn revenue_stats(
    pool: &DbPool,
    shop_id: Uuid,
    window: &ReportWindow,
) -> Result<RevenueStats, AppError> {
    let stats = sqlx::query_as::<_, RevenueStats>(
        r#"
        SELECT
            COUNT(*) AS completed_bookings,
            COALESCE(SUM(rental_cents), 0)::BIGINT AS rental_cents,
            COALESCE(SUM(insurance_cents), 0)::BIGINT AS insurance_cents,
            COALESCE(SUM(total_cents), 0)::BIGINT AS total_cents
        FROM bookings
        WHERE shop_id = $1
          AND status = 'completed'
          AND end_at >= $2 AND end_at < $3
        "#,
    )
    .bind(shop_id)
    .bind(window.from)
    .bind(window.to)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// Share of the window each non-retired scooter spent in active or completed bookings.
pub async fn scooter_utilization(
    pool: &DbPool,
    shop_id: Uuid,
    window: &ReportWindow,
) -> Result<Vec<ScooterUtilization>, AppError> {
    let scooters = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, name FROM scooters WHERE shop_id = $1 AND status <> 'retired' ORDER BY name",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    let rows = sqlx::query_as::<_, (Uuid, DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT scooter_id, start_at, end_at
        FROM bookings
        WHERE shop_id = $1
          AND status IN ('active', 'completed')
          AND start_at < $3 AND end_at > $2
        "#,
    )
    .bind(shop_id)
    .bind(window.from)
    .bind(window.to)
    .fetch_all(pool)
    .await?;

    let mut intervals: HashMap<Uuid, Vec<(DateTime<Utc>, DateTime<Utc>)>> = HashMap::new();
    for (scooter_id, start, end) in rows {
        intervals.entry(scooter_id).or_default().push((start, end));
    }

    let window_seconds = window.seconds() as f64;

    Ok(scooters
        .into_iter()
        .map(|(scooter_id, name)| {
            let rented = intervals
                .get(&scooter_id)
                .map(|list| rented_seconds(list, window))
                .unwrap_or(0);
            ScooterUtilization {
                scooter_id,
                name,
                rented_seconds: rented,
                utilization: (rented as f64 / window_seconds).clamp(0.0, 1.0),
            }
        })
        .collect())
}

/// Scooters with the most completed bookings in the window, ties broken by revenue.
pub async fn top_scooters(
    pool: &DbPool,
    shop_id: Uuid,
    window: &ReportWindow,
    limit: Option<i64>,
) -> Result<Vec<TopScooter>, AppError> {
    let rows = sqlx::query_as::<_, TopScooter>(
        r#"
        SELECT
            s.id AS scooter_id,
            s.name,
            COUNT(b.id) AS completed_bookings,
            COALESCE(SUM(b.total_cents), 0)::BIGINT AS revenue_cents
        FROM scooters s
        JOIN bookings b ON b.scooter_id = s.id
        WHERE s.shop_id = $1
          AND b.status = 'completed'
          AND b.end_at >= $2 AND b.end_at < $3
        GROUP BY s.id, s.name
        ORDER BY completed_bookings DESC, revenue_cents DESC, s.name
        LIMIT $4
        "#,
    )
    .bind(shop_id)
    .bind(window.from)
    .bind(window.to)
    .bind(top_limit(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
