// src/handlers/maintenance.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    credentials::ServiceRoleStore,
    error::AppError,
    handlers::admin::privileged_client,
    models::config_result::ConfigResult,
    seed::{RecoveryReport, run_recovery},
    utils::{hash::constant_time_eq, jwt::Claims},
};

pub const INVALID_RECOVERY_KEY: &str = "Chave de acesso inválida";

/// Verifies that the caller's stored key is accepted by the backend.
pub async fn check_service_role(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(store): State<ServiceRoleStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = match privileged_client(&pool, &config, &store, &claims).await {
        Ok(client) => client.ping().await,
        Err(e) => Err(e),
    };

    let result = match outcome {
        Ok(()) => ConfigResult::ok("Service role key is valid"),
        Err(e) => {
            tracing::warn!("Service role check failed for {}: {}", claims.sub, e);
            ConfigResult::failed("Service role key check failed", &e)
        }
    };

    Ok(Json(result))
}

fn report_response(report: RecoveryReport) -> (StatusCode, Json<RecoveryReport>) {
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}

/// Re-seeds the quiz content. Admin only.
pub async fn recover_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    tracing::info!("Quiz recovery requested by {}", claims.sub);
    report_response(run_recovery(&pool).await)
}

#[derive(Debug, Deserialize)]
pub struct RecoveryKeyParams {
    pub key: Option<String>,
}

/// Re-seeds the quiz content for callers holding the shared recovery secret.
#[utoipa::path(
    get,
    path = "/api/recover-quiz",
    params(("key" = String, Query, description = "Shared recovery secret")),
    responses(
        (status = 200, description = "Quiz content recovered", body = RecoveryReport),
        (status = 401, description = "Wrong or missing key"),
        (status = 405, description = "Method other than GET"),
        (status = 500, description = "Recovery failed", body = RecoveryReport)
    )
)]
pub async fn recover_quiz_with_key(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Query(params): Query<RecoveryKeyParams>,
) -> impl IntoResponse {
    if !recovery_key_matches(config.quiz_recovery_key.as_deref(), params.key.as_deref()) {
        tracing::warn!("Rejected quiz recovery request with an invalid key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": INVALID_RECOVERY_KEY })),
        )
            .into_response();
    }

    report_response(run_recovery(&pool).await).into_response()
}

/// An unset secret rejects every request.
fn recovery_key_matches(expected: Option<&str>, given: Option<&str>) -> bool {
    match (expected, given) {
        (Some(expected), Some(given)) => constant_time_eq(expected, given),
        _ => false,
    }
}
