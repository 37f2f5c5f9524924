//! User and session models.
//!
//! This module defines:
//! - `User`: Database entity for riders, shop owners and admins
//! - `Session`: Sign-in session, stored as a SHA-256 hash of its token
//! - Request/response types for sign-up, sign-in and profile updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform-wide role of a user.
///
/// Shop staff are not a role: staff membership is per shop (see `ShopStaffMember`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Rider,
    ShopOwner,
    Admin,
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. The password hash is an Argon2 PHC string and
/// never leaves the server; use `UserResponse` for API output.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Lower-cased, unique
    pub email: String,

    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,

    /// Identity document number, matched against document blacklist entries
    pub document_number: Option<String>,

    pub role: UserRole,

    /// Suspended users cannot sign in and their sessions are rejected
    pub is_suspended: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Newly opened session, as returned by the insert.
///
/// Only the SHA-256 of the token is stored in `sessions`; the middleware
/// hashes the bearer token and looks that hash up.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/auth/sign-up`.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "rider@example.com",
///   "password": "correct horse battery",
///   "full_name": "Ada Rider",
///   "phone": "+15550100",
///   "role": "rider"
/// }
/// ```
///
/// `role` is optional and defaults to `rider`; only `rider` and
/// `shop_owner` may be requested.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
}

/// Request body for `POST /api/v1/auth/sign-in`.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `PATCH /api/v1/auth/me`. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub document_number: Option<String>,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub document_number: Option<String>,
    pub role: UserRole,
    pub is_suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Removes the password hash.
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            document_number: user.document_number,
            role: user.role,
            is_suspended: user.is_suspended,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Returned by sign-up and sign-in.
///
/// ```json
/// {
///   "token": "9f86d081884c7d659a2feaa0c55ad015...",
///   "expires_at": "2025-12-27T10:00:00Z",
///   "user": { "id": "...", "email": "rider@example.com", "role": "rider", ... }
/// }
/// ```
///
/// The token is only ever returned here; the server keeps its hash.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Query string for `GET /api/v1/admin/users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
}

/// Request body for `PATCH /api/v1/admin/users/{id}`.
///
/// ```json
/// { "role": "shop_owner", "is_suspended": false }
/// ```
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<UserRole>,
    pub is_suspended: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "rider@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            full_name: "Ada Rider".to_string(),
            phone: None,
            document_number: Some("X123".to_string()),
            role: UserRole::Rider,
            is_suspended: false,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "rider");
        assert!(json.get("updated_at").is_some());
    }
}
