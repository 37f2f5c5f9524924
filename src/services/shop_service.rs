//! Shop access control.
//!
//! Every shop-scoped operation resolves the caller's access level first:
//! the owner (and any admin) has `Owner`, staff members have `Manager` or
//! `Staff` according to their membership, everyone else has none.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::shop::{Shop, ShopAccess, StaffRole},
};

/// Pure access resolution.
pub fn resolve_access(
    shop_owner_id: Uuid,
    user_id: Uuid,
    is_admin: bool,
    staff_role: Option<StaffRole>,
) -> Option<ShopAccess> {
    if is_admin || shop_owner_id == user_id {
        return Some(ShopAccess::Owner);
    }
    staff_role.map(ShopAccess::from)
}

/// Shop row joined with the caller's staff membership, if any.
#[derive(sqlx::FromRow)]
struct ShopWithMembership {
    #[sqlx(flatten)]
    shop: Shop,
    staff_role: Option<StaffRole>,
}

/// Load a shop and check the caller holds at least `min` access on it.
///
/// Runs as a single statement, so inside a transaction pass `&mut *tx`
/// rather than the pool.
///
/// # Errors
///
/// - `NotFound("shop")`: shop does not exist
/// - `Forbidden`: caller's access is below `min`
pub async fn require_shop_access<'e, E>(
    executor: E,
    auth: &AuthContext,
    shop_id: Uuid,
    min: ShopAccess,
) -> Result<Shop, AppError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ShopWithMembership>(
        r#"
        SELECT s.*, st.staff_role
        FROM shops s
        LEFT JOIN shop_staff st ON st.shop_id = s.id AND st.user_id = $2
        WHERE s.id = $1
        "#,
    )
    .bind(shop_id)
    .bind(auth.user_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("shop"))?;

    match resolve_access(row.shop.owner_id, auth.user_id, auth.is_admin(), row.staff_role) {
        Some(access) if access >= min => Ok(row.shop),
        _ => Err(AppError::Forbidden),
    }
}

/// Non-failing variant used where a caller may be rider or staff.
pub async fn has_shop_access<'e, E>(
    executor: E,
    auth: &AuthContext,
    shop_id: Uuid,
    min: ShopAccess,
) -> Result<bool, AppError>
where
    E: PgExecutor<'e>,
{
    match require_shop_access(executor, auth, shop_id, min).await {
        Ok(_) => Ok(true),
        Err(AppError::Forbidden) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_get_owner_access() {
        let owner = Uuid::new_v4();
        assert_eq!(
            resolve_access(owner, owner, false, None),
            Some(ShopAccess::Owner)
        );
        assert_eq!(
            resolve_access(owner, Uuid::new_v4(), true, None),
            Some(ShopAccess::Owner)
        );
    }

    #[test]
    fn staff_access_follows_membership() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        assert_eq!(
            resolve_access(owner, member, false, Some(StaffRole::Manager)),
            Some(ShopAccess::Manager)
        );
        assert_eq!(
            resolve_access(owner, member, false, Some(StaffRole::Staff)),
            Some(ShopAccess::Staff)
        );
        assert_eq!(resolve_access(owner, member, false, None), None);
    }
}
