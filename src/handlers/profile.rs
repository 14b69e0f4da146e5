use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{
        Identity, ProfileSources, RoleRow, SubmissionOwner, UpdateProfileRequest, UserMetadata,
    },
    utils::{html::clean_text, jwt::Claims},
};

async fn load_own_profile(pool: &PgPool, claims: &Claims) -> Result<ProfileSources, AppError> {
    let user_id = claims.user_id()?;

    let identity = sqlx::query_as::<_, Identity>(
        r#"
        SELECT id, email, user_metadata, created_at, last_sign_in_at
        FROM auth_users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let role = sqlx::query_as::<_, RoleRow>("SELECT user_id, role FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    let submission = sqlx::query_as::<_, SubmissionOwner>(
        "SELECT user_id FROM quiz_submissions WHERE user_id = $1 LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(ProfileSources {
        identity,
        role,
        submission,
    })
}

/// Get the current user's profile, including role and submission flags.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_own_profile(&pool, &claims).await?.into_profile()))
}

/// Update name, phone or avatar of the current user. Omitted fields are kept.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut sources = load_own_profile(&pool, &claims).await?;
    let metadata = apply_profile_update(&sources.identity.user_metadata, payload);

    sqlx::query("UPDATE auth_users SET user_metadata = $1 WHERE id = $2")
        .bind(SqlJson(&metadata))
        .bind(sources.identity.id)
        .execute(&pool)
        .await?;

    sources.identity.user_metadata = SqlJson(metadata);
    Ok(Json(sources.into_profile()))
}

/// Merges an update into existing metadata. Blank strings clear a field.
pub fn apply_profile_update(current: &UserMetadata, update: UpdateProfileRequest) -> UserMetadata {
    fn merge(current: &Option<String>, new: Option<String>) -> Option<String> {
        match new {
            Some(value) => Some(clean_text(&value)).filter(|v| !v.is_empty()),
            None => current.clone(),
        }
    }

    UserMetadata {
        name: merge(&current.name, update.name),
        phone: merge(&current.phone, update.phone),
        avatar_url: match update.avatar_url {
            Some(url) => Some(url.trim().to_string()).filter(|v| !v.is_empty()),
            None => current.avatar_url.clone(),
        },
    }
}
