// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    credentials::{CredentialError, ServiceRoleStore},
    error::AppError,
    handlers::profile::apply_profile_update,
    models::{
        config_result::{ConfigResult, ServiceRoleRequest, ServiceRoleStatus},
        submission::{AnswerReview, QuizSubmission, SUBMISSION_COLUMNS, SubmissionWithAnswers},
        user::{
            AdminUpdateUserRequest, ImportReport, ImportUsersRequest, RoleRow, SubmissionOwner,
            UpdateProfileRequest, UserListParams, UserMetadata, UserProfile, dedupe_import,
            filter_profiles, merge_profiles,
        },
    },
    privileged::PrivilegedClient,
    utils::{hash::hash_password, html::clean_text, jwt::Claims},
};

/// Builds the privileged client from the calling admin's stored key.
pub(crate) async fn privileged_client(
    pool: &PgPool,
    config: &Config,
    store: &ServiceRoleStore,
    claims: &Claims,
) -> Result<PrivilegedClient, AppError> {
    let slot = store.for_owner(claims.user_id()?);
    PrivilegedClient::from_store(pool.clone(), &slot, &config.service_role_key).await
}

async fn fetch_roles(pool: &PgPool) -> Result<Vec<RoleRow>, AppError> {
    Ok(sqlx::query_as::<_, RoleRow>("SELECT user_id, role FROM user_roles")
        .fetch_all(pool)
        .await?)
}

async fn fetch_submission_owners(pool: &PgPool) -> Result<Vec<SubmissionOwner>, AppError> {
    Ok(
        sqlx::query_as::<_, SubmissionOwner>("SELECT DISTINCT user_id FROM quiz_submissions")
            .fetch_all(pool)
            .await?,
    )
}

/// Identities, roles and submissions fetched together and merged per user.
///
/// Any failing fetch fails the whole call; nothing partial is returned.
pub async fn load_user_profiles(
    client: &PrivilegedClient,
    pool: &PgPool,
) -> Result<Vec<UserProfile>, AppError> {
    let (identities, roles, submissions) = tokio::try_join!(
        client.list_identities(),
        fetch_roles(pool),
        fetch_submission_owners(pool),
    )
    .map_err(|e| {
        tracing::error!("Failed to load user list: {:?}", e);
        e
    })?;

    Ok(merge_profiles(identities, roles, submissions))
}

/// Lists every user with admin and submission flags.
/// Admin only; needs the caller's service-role key.
pub async fn list_users(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let client = privileged_client(&pool, &config, &store, &claims).await?;
    let profiles = load_user_profiles(&client, &pool).await?;

    Ok(Json(filter_profiles(profiles, params.search.as_deref())))
}

/// Updates profile fields and the admin flag of a user.
/// Admin only. An admin cannot revoke their own role.
pub async fn update_user(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.is_admin == Some(false) && id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot revoke your own admin role".to_string()));
    }

    let client = privileged_client(&pool, &config, &store, &claims).await?;

    let identity = client
        .get_identity(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let metadata = apply_profile_update(
        &identity.user_metadata,
        UpdateProfileRequest {
            name: payload.name,
            phone: payload.phone,
            avatar_url: payload.avatar_url,
        },
    );
    client.update_metadata(id, &metadata).await?;

    if let Some(is_admin) = payload.is_admin {
        client.set_admin(id, is_admin).await?;
        tracing::info!("Admin flag of {} set to {} by {}", id, is_admin, claims.sub);
    }

    Ok(StatusCode::OK)
}

/// Deletes a user and everything that references them.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let client = privileged_client(&pool, &config, &store, &claims).await?;

    if !client.delete_identity(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} deleted by {}", id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates users in bulk. Existing emails are skipped, invalid rows reported.
/// Admin only.
pub async fn import_users(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportUsersRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.users.is_empty() {
        return Err(AppError::BadRequest("No users to import".to_string()));
    }

    let client = privileged_client(&pool, &config, &store, &claims).await?;
    client.authenticate()?;

    let (users, duplicates) = dedupe_import(payload.users);
    let mut report = ImportReport {
        skipped: duplicates,
        ..Default::default()
    };

    for user in users {
        if let Err(validation_errors) = user.validate() {
            report.record_failure(&user.email, validation_errors);
            continue;
        }

        // Users imported without a password must reset it before logging in.
        let password = user
            .password
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let metadata = UserMetadata {
            name: user.name.as_deref().map(clean_text).filter(|v| !v.is_empty()),
            phone: user.phone.as_deref().map(clean_text).filter(|v| !v.is_empty()),
            avatar_url: None,
        };

        let created = match hash_password(&password) {
            Ok(hash) => {
                client
                    .create_identity(&user.email, &hash, &metadata, user.is_admin)
                    .await
            }
            Err(e) => Err(e),
        };

        match created {
            Ok(Some(_)) => report.created += 1,
            Ok(None) => report.skipped += 1,
            Err(e) => {
                tracing::error!("Import of {} failed: {:?}", user.email, e);
                report.record_failure(&user.email, "could not be created");
            }
        }
    }

    tracing::info!(
        "Import by {}: {} created, {} skipped, {} invalid",
        claims.sub,
        report.created,
        report.skipped,
        report.errors.len()
    );

    Ok(Json(report))
}

/// One submission with every answer next to its question, for review.
/// Admin only.
pub async fn submission_detail(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    let answers = sqlx::query_as::<_, AnswerReview>(
        r#"
        SELECT
            m.order_number AS module_order,
            m.title AS module_title,
            q.id AS question_id,
            q.order_number AS question_order,
            q.question_text,
            a.answer,
            o.option_text AS answer_text
        FROM quiz_answers a
        JOIN quiz_questions q ON q.id = a.question_id
        JOIN quiz_modules m ON m.id = q.module_id
        LEFT JOIN quiz_options o ON o.question_id = q.id AND o.value = a.answer
        WHERE a.submission_id = $1
        ORDER BY m.order_number, q.order_number
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answers for {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(SubmissionWithAnswers {
        submission,
        answers,
    }))
}

/// Whether the calling admin has a service-role key stored.
pub async fn service_role_status(
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let configured = store.for_owner(claims.user_id()?).exists().await?;
    Ok(Json(ServiceRoleStatus { configured }))
}

/// Stores the calling admin's service-role key after a format check.
pub async fn set_service_role(
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ServiceRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let slot = store.for_owner(claims.user_id()?);

    match slot.set(&payload.key).await {
        Ok(()) => {
            tracing::info!("Service role key configured by {}", claims.sub);
            Ok((
                StatusCode::OK,
                Json(ConfigResult::ok("Service role key saved")),
            ))
        }
        Err(e @ (CredentialError::Empty | CredentialError::InvalidFormat)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(ConfigResult::failed(
                "Service role key rejected",
                &AppError::from(e),
            )),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Forgets the calling admin's service-role key.
pub async fn clear_service_role(
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    store.for_owner(claims.user_id()?).clear().await?;
    Ok(Json(ConfigResult::ok("Service role key removed")))
}
