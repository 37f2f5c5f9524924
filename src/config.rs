//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `SESSION_TTL_HOURS` (optional): sign-in session lifetime, defaults to 168 (one week)
/// - `ONBOARDING_CODE_TTL_MINUTES` (optional): activation code lifetime, defaults to 15
/// - `ONBOARDING_SWEEP_INTERVAL_SECS` (optional): expiry sweep period, defaults to 60
/// - `UPLOAD_DIR` (optional): where uploaded files are written, defaults to `./uploads`
/// - `PUBLIC_BASE_URL` (optional): prefix for public file URLs and QR payloads
/// - `MAX_UPLOAD_BYTES` (optional): upload size limit, defaults to 10 MiB
/// - `BOOTSTRAP_ADMIN_EMAIL` (optional): signing up with this email grants the admin role
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_onboarding_code_ttl_minutes")]
    pub onboarding_code_ttl_minutes: i64,

    #[serde(default = "default_onboarding_sweep_interval_secs")]
    pub onboarding_sweep_interval_secs: u64,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

fn default_onboarding_code_ttl_minutes() -> i64 {
    15
}

fn default_onboarding_sweep_interval_secs() -> u64 {
    60
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    /// Whether `email` is the configured bootstrap admin address.
    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.bootstrap_admin_email
            .as_deref()
            .is_some_and(|admin| admin.trim().eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests; the database is never contacted.
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/scooter_rental_test".to_string(),
            server_port: default_port(),
            database_max_connections: default_max_connections(),
            session_ttl_hours: default_session_ttl_hours(),
            onboarding_code_ttl_minutes: default_onboarding_code_ttl_minutes(),
            onboarding_sweep_interval_secs: default_onboarding_sweep_interval_secs(),
            upload_dir: std::env::temp_dir()
                .join("scooter_rental_uploads")
                .to_string_lossy()
                .into_owned(),
            public_base_url: "http://localhost:3000/".to_string(),
            max_upload_bytes: 1024,
            bootstrap_admin_email: Some("Root@Example.com".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let vars = vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/db".to_string(),
        )];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.session_ttl_hours, 168);
        assert_eq!(config.onboarding_code_ttl_minutes, 15);
        assert_eq!(config.upload_dir, "./uploads");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.bootstrap_admin_email.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let vars: Vec<(String, String)> = vec![("SERVER_PORT".to_string(), "8080".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let config = Config::for_tests();
        assert_eq!(config.base_url(), "http://localhost:3000");
    }

    #[test]
    fn bootstrap_admin_match_ignores_case() {
        let config = Config::for_tests();
        assert!(config.is_bootstrap_admin("root@example.com"));
        assert!(!config.is_bootstrap_admin("rider@example.com"));
    }
}
