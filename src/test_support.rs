//! Fixtures for tests that run against PostgreSQL.
//!
//! These tests are `#[ignore]`d by default and additionally skip themselves
//! when `DATABASE_URL` is unset. Run them with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.
//!
//! Every fixture creates fresh rows with random identifiers, so tests can
//! share one database and run in parallel.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    middleware::auth::AuthContext,
    models::{
        booking::{Booking, CreateBookingRequest},
        user::UserRole,
    },
    services::booking_service,
};

/// Migrated pool with at most `max_connections`, or `None` when no
/// database is configured.
pub async fn pool(max_connections: u32) -> Option<DbPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };

    let pool = db::create_pool(&url, max_connections)
        .await
        .expect("connect to DATABASE_URL");
    db::run_migrations(&pool).await.expect("run migrations");
    Some(pool)
}

/// Insert a user and return the context a session for them would carry.
pub async fn user(pool: &DbPool, role: UserRole) -> AuthContext {
    user_with_document(pool, role, None).await
}

pub async fn user_with_document(
    pool: &DbPool,
    role: UserRole,
    document_number: Option<&str>,
) -> AuthContext {
    let email = format!("user-{}@example.test", Uuid::new_v4());

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, full_name, role, document_number)
        VALUES ($1, 'not-a-real-hash', 'Test User', $2, $3)
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(role)
    .bind(document_number)
    .fetch_one(pool)
    .await
    .expect("insert user");

    AuthContext {
        user_id,
        session_id: Uuid::new_v4(),
        email,
        role,
    }
}

/// Approved shop owned by `owner`.
pub async fn approved_shop(pool: &DbPool, owner: &AuthContext) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO shops (owner_id, name, status) VALUES ($1, 'Test Shop', 'approved') RETURNING id",
    )
    .bind(owner.user_id)
    .fetch_one(pool)
    .await
    .expect("insert shop")
}

/// Available scooter at 500 cents an hour, no daily rate.
pub async fn scooter(pool: &DbPool, shop_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO scooters (shop_id, name, model, serial_number, hourly_rate_cents)
        VALUES ($1, 'Test Scooter', 'Model T', $2, 500)
        RETURNING id
        "#,
    )
    .bind(shop_id)
    .bind(format!("SN-{}", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .expect("insert scooter")
}

/// Start of the next whole hour plus `hours`.
pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    let now = Utc::now();
    let trimmed = now - Duration::seconds(now.timestamp() % 3600);
    trimmed + Duration::hours(hours + 1)
}

pub async fn booking(
    pool: &DbPool,
    rider: &AuthContext,
    scooter_id: Uuid,
    start_hours: i64,
    end_hours: i64,
) -> Booking {
    booking_service::create_booking(
        pool,
        rider.user_id,
        CreateBookingRequest {
            scooter_id,
            start_at: hours_from_now(start_hours),
            end_at: hours_from_now(end_hours),
            insurance_policy_id: None,
            notes: None,
        },
    )
    .await
    .expect("create booking")
}
