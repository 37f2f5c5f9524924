//! Shop, branch and staff models.
//!
//! A shop is a rental business. It is created `pending` and becomes visible
//! to riders once an admin approves it. Branches are pickup locations and
//! staff are users granted access to manage the shop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Moderation status of a shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "shop_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShopStatus {
    Pending,
    Approved,
    Suspended,
    Rejected,
}

/// Represents a shop record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: ShopStatus,

    /// Note left by the admin on the last moderation decision
    pub moderation_note: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/shops`.
///
/// ```json
/// {
///   "name": "Harbour Scooters",
///   "description": "E-scooters by the pier",
///   "phone": "+15550101",
///   "email": "hello@harbour.example",
///   "address": "1 Pier Road"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Request body for `PATCH /api/v1/shops/{id}`. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Request body for `POST /api/v1/admin/shops/{id}/moderate`.
#[derive(Debug, Deserialize)]
pub struct ModerateShopRequest {
    pub status: ShopStatus,
    pub note: Option<String>,
}

/// Query string for `GET /api/v1/admin/shops`.
#[derive(Debug, Default, Deserialize)]
pub struct ShopListQuery {
    pub status: Option<ShopStatus>,
}

/// Pickup location belonging to a shop.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Branch {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Role of a staff member inside one shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "staff_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Manager,
    Staff,
}

/// Staff membership joined with the member's identity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ShopStaffMember {
    pub shop_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub staff_role: StaffRole,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/shops/{id}/staff`.
///
/// The user must already have an account.
#[derive(Debug, Deserialize)]
pub struct AddStaffRequest {
    pub email: String,
    #[serde(default = "default_staff_role")]
    pub staff_role: StaffRole,
}

fn default_staff_role() -> StaffRole {
    StaffRole::Staff
}

/// Access level a user holds on a shop, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShopAccess {
    Staff,
    Manager,
    Owner,
}

impl From<StaffRole> for ShopAccess {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Manager => ShopAccess::Manager,
            StaffRole::Staff => ShopAccess::Staff,
        }
    }
}

/// Validate a branch coordinate pair.
pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), String> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err("latitude must be between -90 and 90".to_string());
        }
    }
    if let Some(lng) = longitude {
        if !(-180.0..=180.0).contains(&lng) {
            return Err("longitude must be between -180 and 180".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_are_ordered() {
        assert!(ShopAccess::Owner > ShopAccess::Manager);
        assert!(ShopAccess::Manager > ShopAccess::Staff);
        assert_eq!(ShopAccess::from(StaffRole::Manager), ShopAccess::Manager);
    }

    #[test]
    fn coordinates_outside_range_are_rejected() {
        assert!(validate_coordinates(Some(45.0), Some(-122.5)).is_ok());
        assert!(validate_coordinates(None, None).is_ok());
        assert!(validate_coordinates(Some(91.0), None).is_err());
        assert!(validate_coordinates(None, Some(-180.5)).is_err());
    }

    #[test]
    fn staff_role_defaults_to_staff() {
        let request: AddStaffRequest =
            serde_json::from_str(r#"{"email": "crew@example.com"}"#).unwrap();
        assert_eq!(request.staff_role, StaffRole::Staff);
    }
}
