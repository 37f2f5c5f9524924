//! Onboarding session service.
//!
//! Handles activation code generation, activation, step tracking and expiry.
//! Activation and step changes lock the session row, so two riders racing
//! to redeem the same code cannot both succeed.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::time::interval;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{self, DbPool},
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        onboarding::{
            AdvanceOnboardingRequest, CreateOnboardingSessionRequest, OnboardingSession,
            OnboardingStatus, OnboardingStep,
        },
        shop::ShopAccess,
    },
    services::shop_service,
};

/// Attempts at drawing a code that no pending session is using.
const CODE_ATTEMPTS: usize = 5;

/// Draw a 6-digit activation code from the thread-local CSPRNG.
pub fn generate_activation_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{:06}", n)
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// URL encoded into the session QR code.
pub fn qr_payload(base_url: &str, code: &str) -> String {
    format!("{}/onboarding/activate?code={}", base_url, code)
}

pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}

/// Validate a step completion, returning the step the session moves to.
pub fn plan_advance(
    status: OnboardingStatus,
    current: OnboardingStep,
    completing: OnboardingStep,
    document_url: Option<&str>,
) -> Result<OnboardingStep, AppError> {
    if status != OnboardingStatus::Active {
        return Err(AppError::InvalidTransition {
            from: status.as_str().to_string(),
            to: completing.as_str().to_string(),
        });
    }

    let next = match current.next() {
        Some(next) if completing == current => next,
        _ => {
            return Err(AppError::InvalidTransition {
                from: current.as_str().to_string(),
                to: completing.as_str().to_string(),
            });
        }
    };

    if completing == OnboardingStep::DocumentUpload
        && document_url.is_none_or(|url| url.trim().is_empty())
    {
        return Err(AppError::InvalidRequest(
            "document_url is required to complete document_upload".to_string(),
        ));
    }

    Ok(next)
}

/// Create a session for a shop.
///
/// # Process
///
/// 1. Check the caller is shop staff
/// 2. Check the optional booking belongs to the shop
/// 3. Draw a code and insert; on a collision with another pending session, redraw
pub async fn create_session(
    pool: &DbPool,
    config: &Config,
    auth: &AuthContext,
    shop_id: Uuid,
    request: CreateOnboardingSessionRequest,
) -> Result<OnboardingSession, AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Staff).await?;

    if let Some(booking_id) = request.booking_id {
        let booking_shop: Uuid = sqlx::query_scalar("SELECT shop_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("booking"))?;

        if booking_shop != shop_id {
            return Err(AppError::InvalidRequest(
                "Booking belongs to another shop".to_string(),
            ));
        }
    }

    let expires_at = Utc::now() + Duration::minutes(config.onboarding_code_ttl_minutes);

    let session = insert_with_unique_code(
        pool,
        config.base_url(),
        auth.user_id,
        shop_id,
        request.booking_id,
        expires_at,
        generate_activation_code,
    )
    .await?;

    tracing::info!(session_id = %session.id, shop_id = %shop_id, "Onboarding session created");

    Ok(session)
}

/// Insert a pending session, redrawing the code while it collides with
/// another pending session.
async fn insert_with_unique_code(
    pool: &DbPool,
    base_url: &str,
    created_by: Uuid,
    shop_id: Uuid,
    booking_id: Option<Uuid>,
    expires_at: DateTime<Utc>,
    mut draw_code: impl FnMut() -> String,
) -> Result<OnboardingSession, AppError> {
    for attempt in 1..=CODE_ATTEMPTS {
        let code = draw_code();

        let result = sqlx::query_as::<_, OnboardingSession>(
            r#"
            INSERT INTO onboarding_sessions (
                shop_id, booking_id, activation_code, qr_payload, expires_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(shop_id)
        .bind(booking_id)
        .bind(&code)
        .bind(qr_payload(base_url, &code))
        .bind(expires_at)
        .bind(created_by)
        .fetch_one(pool)
        .await;

        match result {
            Ok(session) => return Ok(session),
            Err(e) if db::is_unique_violation(&e) => {
                tracing::warn!(attempt, "Activation code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "could not allocate a unique activation code".to_string(),
    ))
}

/// Redeem an activation code.
///
/// # Errors
///
/// - `InvalidRequest`: code is not 6 digits
/// - `NotFound`: no pending session has this code
/// - `OnboardingExpired`: the code expired; the session is marked `expired`
/// - `Forbidden`: the session is tied to another rider's booking
pub async fn activate(
    pool: &DbPool,
    auth: &AuthContext,
    code: &str,
) -> Result<OnboardingSession, AppError> {
    let code = code.trim();
    if !is_valid_code(code) {
        return Err(AppError::InvalidRequest(
            "Activation code must be 6 digits".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, OnboardingSession>(
        "SELECT * FROM onboarding_sessions WHERE activation_code = $1 AND status = 'pending' FOR UPDATE",
    )
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("onboarding session"))?;

    if is_expired(session.expires_at, Utc::now()) {
        sqlx::query(
            "UPDATE onboarding_sessions SET status = 'expired', updated_at = NOW() WHERE id = $1",
        )
        .bind(session.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(session_id = %session.id, "Onboarding code used after expiry");
        return Err(AppError::OnboardingExpired);
    }

    if let Some(booking_id) = session.booking_id {
        let booking_rider: Uuid = sqlx::query_scalar("SELECT rider_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_one(&mut *tx)
            .await?;

        if booking_rider != auth.user_id {
            return Err(AppError::Forbidden);
        }
    }

    let activated = sqlx::query_as::<_, OnboardingSession>(
        r#"
        UPDATE onboarding_sessions
        SET status = 'active',
            rider_id = $2,
            activated_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(session.id)
    .bind(auth.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(session_id = %activated.id, rider_id = %auth.user_id, "Onboarding session activated");

    Ok(activated)
}

/// Complete the session's current step.
pub async fn advance(
    pool: &DbPool,
    auth: &AuthContext,
    session_id: Uuid,
    request: AdvanceOnboardingRequest,
) -> Result<OnboardingSession, AppError> {
    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, OnboardingSession>(
        "SELECT * FROM onboarding_sessions WHERE id = $1 FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?
    .filter(|s| s.rider_id == Some(auth.user_id))
    .ok_or(AppError::NotFound("onboarding session"))?;

    let next = plan_advance(
        session.status,
        session.current_step,
        request.step,
        request.document_url.as_deref(),
    )?;

    let document_url = if request.step == OnboardingStep::DocumentUpload {
        request.document_url.map(|url| url.trim().to_string())
    } else {
        None
    };

    let completed = next == OnboardingStep::Done;

    let updated = sqlx::query_as::<_, OnboardingSession>(
        r#"
        UPDATE onboarding_sessions
        SET current_step = $2,
            document_url = COALESCE($3, document_url),
            status = CASE WHEN $4 THEN 'completed'::onboarding_status ELSE status END,
            completed_at = CASE WHEN $4 THEN NOW() ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(session.id)
    .bind(next)
    .bind(document_url)
    .bind(completed)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        session_id = %updated.id,
        step = next.as_str(),
        "Onboarding step completed"
    );

    Ok(updated)
}

/// Cancel a pending or active session (shop staff).
pub async fn cancel(
    pool: &DbPool,
    auth: &AuthContext,
    session_id: Uuid,
) -> Result<OnboardingSession, AppError> {
    let mut tx = pool.begin().await?;

    let session = sqlx::query_as::<_, OnboardingSession>(
        "SELECT * FROM onboarding_sessions WHERE id = $1 FOR UPDATE",
    )
    .bind(session_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("onboarding session"))?;

    shop_service::require_shop_access(&mut *tx, auth, session.shop_id, ShopAccess::Staff).await?;

    if !matches!(
        session.status,
        OnboardingStatus::Pending | OnboardingStatus::Active
    ) {
        return Err(AppError::InvalidTransition {
            from: session.status.as_str().to_string(),
            to: OnboardingStatus::Cancelled.as_str().to_string(),
        });
    }

    let cancelled = sqlx::query_as::<_, OnboardingSession>(
        "UPDATE onboarding_sessions SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(session.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(cancelled)
}

/// Get a session visible to the caller (its rider or shop staff).
pub async fn get_session(
    pool: &DbPool,
    auth: &AuthContext,
    session_id: Uuid,
) -> Result<OnboardingSession, AppError> {
    let session =
        sqlx::query_as::<_, OnboardingSession>("SELECT * FROM onboarding_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("onboarding session"))?;

    if session.rider_id == Some(auth.user_id)
        || shop_service::has_shop_access(pool, auth, session.shop_id, ShopAccess::Staff).await?
    {
        Ok(session)
    } else {
        Err(AppError::NotFound("onboarding session"))
    }
}

/// List a shop's sessions, newest first (shop staff).
pub async fn list_sessions(
    pool: &DbPool,
    auth: &AuthContext,
    shop_id: Uuid,
) -> Result<Vec<OnboardingSession>, AppError> {
    shop_service::require_shop_access(pool, auth, shop_id, ShopAccess::Staff).await?;

    let sessions = sqlx::query_as::<_, OnboardingSession>(
        "SELECT * FROM onboarding_sessions WHERE shop_id = $1 ORDER BY created_at DESC LIMIT 100",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// Mark pending sessions past their expiry as `expired`.
pub async fn expire_stale_sessions(pool: &DbPool) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE onboarding_sessions
        SET status = 'expired', updated_at = NOW()
        WHERE status = 'pending' AND expires_at <= NOW()
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Background task that periodically expires stale onboarding sessions.
pub struct OnboardingExpirySweeper {
    pool: DbPool,
    poll_interval: StdDuration,
}

impl OnboardingExpirySweeper {
    /// Spawn the sweeper on the tokio runtime.
    pub fn spawn(pool: DbPool, poll_interval: StdDuration) -> tokio::task::JoinHandle<()> {
        let sweeper = Self {
            pool,
            poll_interval,
        };
        tokio::spawn(async move {
            sweeper.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            "Starting onboarding expiry sweeper with interval {:?}",
            self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;
            match expire_stale_sessions(&self.pool).await {
                Ok(0) => tracing::debug!("Onboarding sweep: nothing to expire"),
                Ok(count) => tracing::info!(count, "Expired stale onboarding sessions"),
                Err(e) => tracing::error!("Onboarding sweep failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::UserRole, test_support};

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_activation_code();
            assert!(is_valid_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn code_validation() {
        assert!(is_valid_code("000123"));
        assert!(!is_valid_code("12345"));
        assert!(!is_valid_code("1234567"));
        assert!(!is_valid_code("12a456"));
    }

    #[test]
    fn qr_payload_embeds_code() {
        assert_eq!(
            qr_payload("https://rent.example", "042917"),
            "https://rent.example/onboarding/activate?code=042917"
        );
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        assert!(is_expired(now, now));
        assert!(is_expired(now - Duration::seconds(1), now));
        assert!(!is_expired(now + Duration::minutes(1), now));
    }

    #[test]
    fn steps_must_be_completed_in_order() {
        let next = plan_advance(
            OnboardingStatus::Active,
            OnboardingStep::IdentityVerification,
            OnboardingStep::IdentityVerification,
            None,
        )
        .unwrap();
        assert_eq!(next, OnboardingStep::DocumentUpload);

        let err = plan_advance(
            OnboardingStatus::Active,
            OnboardingStep::IdentityVerification,
            OnboardingStep::Agreement,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[test]
    fn document_step_needs_a_document() {
        let err = plan_advance(
            OnboardingStatus::Active,
            OnboardingStep::DocumentUpload,
            OnboardingStep::DocumentUpload,
            Some("  "),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let next = plan_advance(
            OnboardingStatus::Active,
            OnboardingStep::DocumentUpload,
            OnboardingStep::DocumentUpload,
            Some("http://localhost:3000/uploads/documents/id.pdf"),
        )
        .unwrap();
        assert_eq!(next, OnboardingStep::Agreement);
    }

    #[test]
    fn agreement_completes_the_session() {
        let next = plan_advance(
            OnboardingStatus::Active,
            OnboardingStep::Agreement,
            OnboardingStep::Agreement,
            None,
        )
        .unwrap();
        assert_eq!(next, OnboardingStep::Done);
    }

    #[test]
    fn only_active_sessions_advance() {
        for status in [
            OnboardingStatus::Pending,
            OnboardingStatus::Completed,
            OnboardingStatus::Expired,
            OnboardingStatus::Cancelled,
        ] {
            assert!(
                plan_advance(
                    status,
                    OnboardingStep::IdentityVerification,
                    OnboardingStep::IdentityVerification,
                    None
                )
                .is_err()
            );
        }

        // Nothing follows done
        assert!(
            plan_advance(
                OnboardingStatus::Active,
                OnboardingStep::Done,
                OnboardingStep::Done,
                None
            )
            .is_err()
        );
    }

    async fn staffed_shop(pool: &DbPool) -> (AuthContext, Uuid) {
        let owner = test_support::user(pool, UserRole::ShopOwner).await;
        let shop_id = test_support::approved_shop(pool, &owner).await;
        (owner, shop_id)
    }

    async fn stored_status(pool: &DbPool, session_id: Uuid) -> OnboardingStatus {
        sqlx::query_scalar("SELECT status FROM onboarding_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn complete(step: OnboardingStep, document_url: Option<&str>) -> AdvanceOnboardingRequest {
        AdvanceOnboardingRequest {
            step,
            document_url: document_url.map(str::to_string),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn expired_code_is_marked_expired() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let (owner, shop_id) = staffed_shop(&pool).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let config = Config::for_tests();

        let session = create_session(&pool, &config, &owner, shop_id, Default::default())
            .await
            .unwrap();
        sqlx::query(
            "UPDATE onboarding_sessions SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1",
        )
        .bind(session.id)
        .execute(&pool)
        .await
        .unwrap();

        let err = activate(&pool, &rider, &session.activation_code).await.unwrap_err();
        assert!(matches!(err, AppError::OnboardingExpired));
        assert_eq!(stored_status(&pool, session.id).await, OnboardingStatus::Expired);

        // The code is no longer redeemable
        let again = activate(&pool, &rider, &session.activation_code).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn rider_walks_through_every_step() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let (owner, shop_id) = staffed_shop(&pool).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let config = Config::for_tests();

        let session = create_session(&pool, &config, &owner, shop_id, Default::default())
            .await
            .unwrap();
        assert!(session.qr_payload.ends_with(&session.activation_code));

        let active = activate(&pool, &rider, &session.activation_code).await.unwrap();
        assert_eq!(active.status, OnboardingStatus::Active);
        assert_eq!(active.rider_id, Some(rider.user_id));

        let step = advance(&pool, &rider, session.id, complete(OnboardingStep::IdentityVerification, None))
            .await
            .unwrap();
        assert_eq!(step.current_step, OnboardingStep::DocumentUpload);

        let missing_document =
            advance(&pool, &rider, session.id, complete(OnboardingStep::DocumentUpload, None)).await;
        assert!(matches!(missing_document, Err(AppError::InvalidRequest(_))));

        let url = "http://localhost:3000/uploads/documents/licence.pdf";
        let step = advance(&pool, &rider, session.id, complete(OnboardingStep::DocumentUpload, Some(url)))
            .await
            .unwrap();
        assert_eq!(step.current_step, OnboardingStep::Agreement);
        assert_eq!(step.document_url.as_deref(), Some(url));

        let done = advance(&pool, &rider, session.id, complete(OnboardingStep::Agreement, None))
            .await
            .unwrap();
        assert_eq!(done.current_step, OnboardingStep::Done);
        assert_eq!(done.status, OnboardingStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn colliding_code_is_redrawn() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let (owner, shop_id) = staffed_shop(&pool).await;
        let config = Config::for_tests();
        let expires_at = Utc::now() + Duration::minutes(15);

        let taken = create_session(&pool, &config, &owner, shop_id, Default::default())
            .await
            .unwrap();
        let fresh = std::iter::repeat_with(generate_activation_code)
            .find(|code| *code != taken.activation_code)
            .unwrap();

        // Draws the taken code first, then the fresh one
        let mut draws = vec![fresh.clone(), taken.activation_code.clone()];
        let session = insert_with_unique_code(
            &pool,
            config.base_url(),
            owner.user_id,
            shop_id,
            None,
            expires_at,
            || draws.pop().unwrap_or_default(),
        )
        .await
        .unwrap();
        assert_eq!(session.activation_code, fresh);

        let exhausted = insert_with_unique_code(
            &pool,
            config.base_url(),
            owner.user_id,
            shop_id,
            None,
            expires_at,
            || taken.activation_code.clone(),
        )
        .await;
        assert!(matches!(exhausted, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn cancel_runs_on_a_single_connection() {
        let Some(pool) = test_support::pool(1).await else {
            return;
        };
        let (owner, shop_id) = staffed_shop(&pool).await;
        let config = Config::for_tests();

        let session = create_session(&pool, &config, &owner, shop_id, Default::default())
            .await
            .unwrap();
        let cancelled = cancel(&pool, &owner, session.id).await.unwrap();
        assert_eq!(cancelled.status, OnboardingStatus::Cancelled);

        let twice = cancel(&pool, &owner, session.id).await;
        assert!(matches!(twice, Err(AppError::InvalidTransition { .. })));
    }
}
