// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    credentials::ServiceRoleStore,
    error::AppError,
    models::{
        config_result::ConfigResult,
        user::{Credentials, LoginRequest, RegisterRequest, UserMetadata},
    },
    utils::{
        hash::{hash_password, verify_password},
        html::clean_text,
        jwt::{Claims, ROLE_USER, sign_jwt},
    },
};

/// Lower-cased, trimmed email used for storage and lookups.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Registers a new identity.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with the new id and email.
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = normalize_email(&payload.email);
    let hashed_password = hash_password(&payload.password)?;
    let metadata = UserMetadata {
        name: payload.name.as_deref().map(clean_text).filter(|n| !n.is_empty()),
        ..Default::default()
    };

    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO auth_users (email, password_hash, user_metadata)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&email)
    .bind(&hashed_password)
    .bind(SqlJson(&metadata))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Email '{}' is already registered", email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Registered user {}", id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "email": email, "name": metadata.name })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// The role claim comes from `user_roles`; users without a row are plain users.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, Credentials>(
        r#"
        SELECT u.id, u.email, u.password_hash, r.role
        FROM auth_users u
        LEFT JOIN user_roles r ON r.user_id = u.id
        WHERE u.email = $1
        "#,
    )
    .bind(normalize_email(&payload.email))
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    sqlx::query("UPDATE auth_users SET last_sign_in_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    let role = user.role.as_deref().unwrap_or(ROLE_USER);
    let token = sign_jwt(user.id, &user.email, role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": role
    })))
}

/// Ends the caller's admin context by dropping their stored service-role key.
/// The JWT itself stays valid until it expires.
pub async fn logout(
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    // Only admins can hold a key.
    if claims.is_admin() {
        store.for_owner(claims.user_id()?).clear().await?;
    }
    Ok(Json(ConfigResult::ok("Signed out")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
