//! Blacklist service.
//!
//! Entries either match a rider account or an identity document number,
//! and apply globally (`shop_id IS NULL`) or to a single shop.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::blacklist::{BlacklistEntry, CreateBlacklistEntryRequest},
};

/// Whether a rider is barred from renting, globally or at `shop_id`.
///
/// Matches on the rider id, and on the document number when one is given
/// and non-empty. With `shop_id = None` only global entries are checked.
pub async fn is_rider_blacklisted<'e, E>(
    executor: E,
    rider_id: Uuid,
    document_number: Option<&str>,
    shop_id: Option<Uuid>,
) -> Result<bool, AppError>
where
    E: PgExecutor<'e>,
{
    let document_number = document_number.map(str::trim).filter(|doc| !doc.is_empty());

    let blacklisted: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM blacklist_entries
            WHERE (shop_id IS NULL OR shop_id = $3)
              AND (rider_id = $1 OR ($2::TEXT IS NOT NULL AND document_number = $2))
        )
        "#,
    )
    .bind(rider_id)
    .bind(document_number)
    .bind(shop_id)
    .fetch_one(executor)
    .await?;

    Ok(blacklisted)
}

/// Clean up and validate a create request, returning the document number to store.
pub fn validate_entry(request: &CreateBlacklistEntryRequest) -> Result<Option<String>, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "reason cannot be empty".to_string(),
        ));
    }

    let document_number = request
        .document_number
        .as_deref()
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
        .map(str::to_string);

    if request.rider_id.is_none() && document_number.is_none() {
        return Err(AppError::InvalidRequest(
            "rider_id or document_number is required".to_string(),
        ));
    }

    Ok(document_number)
}

/// Create an entry. `shop_id = None` creates a global entry; callers
/// check that only admins do so.
pub async fn create_entry(
    pool: &DbPool,
    shop_id: Option<Uuid>,
    created_by: Uuid,
    request: CreateBlacklistEntryRequest,
) -> Result<BlacklistEntry, AppError> {
    let document_number = validate_entry(&request)?;

    if let Some(rider_id) = request.rider_id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(rider_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("rider"));
        }
    }

    let entry = sqlx::query_as::<_, BlacklistEntry>(
        r#"
        INSERT INTO blacklist_entries (shop_id, rider_id, document_number, reason, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(request.rider_id)
    .bind(document_number)
    .bind(request.reason.trim())
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        entry_id = %entry.id,
        shop_id = ?entry.shop_id,
        "Blacklist entry created"
    );

    Ok(entry)
}

/// List entries of one scope, newest first.
pub async fn list_entries(
    pool: &DbPool,
    shop_id: Option<Uuid>,
) -> Result<Vec<BlacklistEntry>, AppError> {
    let entries = sqlx::query_as::<_, BlacklistEntry>(
        r#"
        SELECT * FROM blacklist_entries
        WHERE shop_id IS NOT DISTINCT FROM $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

pub async fn get_entry(pool: &DbPool, entry_id: Uuid) -> Result<BlacklistEntry, AppError> {
    sqlx::query_as::<_, BlacklistEntry>("SELECT * FROM blacklist_entries WHERE id = $1")
        .bind(entry_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("blacklist entry"))
}

pub async fn delete_entry(pool: &DbPool, entry_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM blacklist_entries WHERE id = $1")
        .bind(entry_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("blacklist entry"));
    }

    tracing::info!(entry_id = %entry_id, "Blacklist entry deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{booking::CreateBookingRequest, user::UserRole},
        services::booking_service,
        test_support,
    };

    fn request(rider_id: Option<Uuid>, document: Option<&str>, reason: &str) -> CreateBlacklistEntryRequest {
        CreateBlacklistEntryRequest {
            rider_id,
            document_number: document.map(str::to_string),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn requires_a_match_target() {
        assert!(validate_entry(&request(None, None, "fraud")).is_err());
        assert!(validate_entry(&request(None, Some("   "), "fraud")).is_err());
        assert!(validate_entry(&request(Some(Uuid::new_v4()), None, "fraud")).is_ok());
    }

    #[test]
    fn trims_document_number() {
        let doc = validate_entry(&request(None, Some(" X1234 "), "fraud")).unwrap();
        assert_eq!(doc.as_deref(), Some("X1234"));
    }

    #[test]
    fn requires_a_reason() {
        assert!(validate_entry(&request(Some(Uuid::new_v4()), None, "  ")).is_err());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn entries_apply_within_their_scope() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let admin = test_support::user(&pool, UserRole::Admin).await;
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let rider = test_support::user(&pool, UserRole::Rider).await;
        let shop_a = test_support::approved_shop(&pool, &owner).await;
        let shop_b = test_support::approved_shop(&pool, &owner).await;

        assert!(!is_rider_blacklisted(&pool, rider.user_id, None, Some(shop_a)).await.unwrap());

        create_entry(
            &pool,
            Some(shop_a),
            owner.user_id,
            request(Some(rider.user_id), None, "Damaged a scooter"),
        )
        .await
        .unwrap();

        assert!(is_rider_blacklisted(&pool, rider.user_id, None, Some(shop_a)).await.unwrap());
        assert!(!is_rider_blacklisted(&pool, rider.user_id, None, Some(shop_b)).await.unwrap());
        assert!(!is_rider_blacklisted(&pool, rider.user_id, None, None).await.unwrap());

        // A global document entry catches any account presenting that document
        let document = format!("DOC-{}", Uuid::new_v4());
        let other = test_support::user(&pool, UserRole::Rider).await;
        create_entry(&pool, None, admin.user_id, request(None, Some(&document), "Fraud"))
            .await
            .unwrap();

        assert!(is_rider_blacklisted(&pool, other.user_id, Some(&document), Some(shop_b)).await.unwrap());
        assert!(is_rider_blacklisted(&pool, other.user_id, Some(&document), None).await.unwrap());
        assert!(!is_rider_blacklisted(&pool, other.user_id, Some("  "), None).await.unwrap());
        assert!(!is_rider_blacklisted(&pool, other.user_id, None, Some(shop_b)).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn blacklisted_rider_cannot_book() {
        let Some(pool) = test_support::pool(5).await else {
            return;
        };
        let owner = test_support::user(&pool, UserRole::ShopOwner).await;
        let document = format!("DOC-{}", Uuid::new_v4());
        let rider =
            test_support::user_with_document(&pool, UserRole::Rider, Some(&document)).await;
        let shop_id = test_support::approved_shop(&pool, &owner).await;
        let scooter_id = test_support::scooter(&pool, shop_id).await;

        create_entry(&pool, Some(shop_id), owner.user_id, request(None, Some(&document), "Unpaid fees"))
            .await
            .unwrap();

        let result = booking_service::create_booking(
            &pool,
            rider.user_id,
            CreateBookingRequest {
                scooter_id,
                start_at: test_support::hours_from_now(1),
                end_at: test_support::hours_from_now(2),
                insurance_policy_id: None,
                notes: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::RiderBlacklisted)));
    }
}
