//! Authentication service: accounts, passwords and sign-in sessions.
//!
//! # Security
//!
//! - Passwords are hashed with Argon2id (PHC string format)
//! - Session tokens are 32 random bytes, hex-encoded; only their SHA-256
//!   hash is stored, so a database leak does not leak usable tokens
//! - Sign-in failures never reveal whether the email exists

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{self, DbPool},
    error::AppError,
    models::user::{
        Session, SessionResponse, SignInRequest, SignUpRequest, UpdateProfileRequest, User, UserRole,
    },
};

const MIN_PASSWORD_LEN: usize = 8;

/// Hash a session token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new session token (64 hex characters).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Lower-case and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest("Invalid email address".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Decide the role a new account receives.
///
/// Admin can never be requested; it is only granted to the bootstrap email.
pub fn resolve_sign_up_role(
    requested: Option<UserRole>,
    is_bootstrap_admin: bool,
) -> Result<UserRole, AppError> {
    if is_bootstrap_admin {
        return Ok(UserRole::Admin);
    }

    match requested.unwrap_or(UserRole::Rider) {
        UserRole::Admin => Err(AppError::InvalidRequest(
            "Role must be 'rider' or 'shop_owner'".to_string(),
        )),
        role => Ok(role),
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("salt encoding failed: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Check a password against a stored PHC hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Run a CPU-heavy closure off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))
}

/// Create an account and sign it in.
///
/// # Errors
///
/// - `InvalidRequest`: malformed email, short password, empty name, admin role requested
/// - `Conflict`: email already registered
pub async fn sign_up(
    pool: &DbPool,
    config: &Config,
    request: SignUpRequest,
) -> Result<SessionResponse, AppError> {
    let email = normalize_email(&request.email);
    validate_email(&email)?;
    validate_password(&request.password)?;

    let full_name = request.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::InvalidRequest(
            "full_name cannot be empty".to_string(),
        ));
    }

    let role = resolve_sign_up_role(request.role, config.is_bootstrap_admin(&email))?;

    let password = request.password;
    let password_hash = blocking(move || hash_password(&password)).await??;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, full_name, phone, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&password_hash)
    .bind(&full_name)
    .bind(request.phone)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            AppError::Conflict("Email is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(user_id = %user.id, role = ?user.role, "User signed up");

    let (token, expires_at) = create_session(pool, user.id, config.session_ttl_hours).await?;

    Ok(SessionResponse {
        token,
        expires_at,
        user: user.into(),
    })
}

/// Verify credentials and open a new session.
///
/// Unknown email, wrong password and suspended accounts all fail with
/// `InvalidCredentials`.
pub async fn sign_in(
    pool: &DbPool,
    config: &Config,
    request: SignInRequest,
) -> Result<SessionResponse, AppError> {
    let email = normalize_email(&request.email);

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let stored_hash = user.password_hash.clone();
    let password = request.password;
    let valid = blocking(move || verify_password(&password, &stored_hash)).await?;

    if !valid || user.is_suspended {
        return Err(AppError::InvalidCredentials);
    }

    let (token, expires_at) = create_session(pool, user.id, config.session_ttl_hours).await?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(SessionResponse {
        token,
        expires_at,
        user: user.into(),
    })
}

/// Insert a session row and return the plaintext token.
async fn create_session(
    pool: &DbPool,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<(String, DateTime<Utc>), AppError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, expires_at
        "#,
    )
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    tracing::debug!(session_id = %session.id, user_id = %session.user_id, "Session opened");

    Ok((token, session.expires_at))
}

/// Revoke one session.
pub async fn sign_out(pool: &DbPool, session_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke every open session of a user (used when suspending).
pub async fn revoke_all_sessions(pool: &DbPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_user(pool: &DbPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("user"))
}

/// Update profile fields; absent fields are kept.
pub async fn update_profile(
    pool: &DbPool,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> Result<User, AppError> {
    if request
        .full_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(AppError::InvalidRequest(
            "full_name cannot be empty".to_string(),
        ));
    }

    let document_number = request
        .document_number
        .map(|doc| doc.trim().to_string())
        .filter(|doc| !doc.is_empty());

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = COALESCE($2, full_name),
            phone = COALESCE($3, phone),
            document_number = COALESCE($4, document_number),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(request.full_name.map(|name| name.trim().to_string()))
    .bind(request.phone)
    .bind(document_number)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("user"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("abc123");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc123"));
        assert_ne!(hash, hash_token("abc124"));
    }

    #[test]
    fn generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn admin_role_cannot_be_requested() {
        assert_eq!(resolve_sign_up_role(None, false).unwrap(), UserRole::Rider);
        assert_eq!(
            resolve_sign_up_role(Some(UserRole::ShopOwner), false).unwrap(),
            UserRole::ShopOwner
        );
        assert!(resolve_sign_up_role(Some(UserRole::Admin), false).is_err());
        assert_eq!(
            resolve_sign_up_role(Some(UserRole::Rider), true).unwrap(),
            UserRole::Admin
        );
    }

    #[test]
    fn validates_email_and_password() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@").is_err());
        assert!(validate_email("ada@localhost").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
