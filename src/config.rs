// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use dotenvy::dotenv;

use crate::credentials::validate_service_role_key;

/// Default lifetime of an issued JWT (24 hours).
pub const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Seeded on startup when both are present.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    /// The backend's elevated key. Keys stored by admins must match it.
    pub service_role_key: String,

    /// Shared secret for `GET /api/recover-quiz`. Unset disables the endpoint.
    pub quiz_recovery_key: Option<String>,

    pub credential_store_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,

    /// Off by default: `mark-submission-processed` accepts any caller.
    pub mark_processed_requires_admin: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let service_role_key = checked_service_role_key(
            &env::var("SERVICE_ROLE_KEY").expect("SERVICE_ROLE_KEY must be set"),
        );

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a socket address");

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ]
            });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            service_role_key,
            quiz_recovery_key: non_empty_var("QUIZ_RECOVERY_KEY"),
            credential_store_path: env::var("CREDENTIAL_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/credentials.json")),
            bind_addr,
            cors_origins,
            mark_processed_requires_admin: env::var("MARK_PROCESSED_REQUIRES_ADMIN")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

/// Stored admin keys must match this one and only JWT-shaped keys can be
/// stored, so anything else is rejected at startup.
fn checked_service_role_key(raw: &str) -> String {
    validate_service_role_key(raw)
        .unwrap_or_else(|e| panic!("SERVICE_ROLE_KEY is invalid: {}", e))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
