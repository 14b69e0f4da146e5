// src/handlers/functions.rs

//! Function endpoints consumed by the admin dashboard.
//!
//! Unlike the rest of the API these echo backend error messages verbatim in
//! their 500 responses.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::submission::{
        GetSubmissionsRequest, MarkProcessedRequest, StatusFilter, SubmissionSummary,
        SubmissionsResponse,
    },
    privileged::PrivilegedClient,
    utils::jwt::{Claims, bearer_token, verify_jwt},
};

/// Resolves the bearer token and requires the admin role.
/// Every failure is reported as a bare 403.
fn require_admin(headers: &HeaderMap, secret: &str) -> Result<Claims, AppError> {
    let forbidden = || AppError::Forbidden("Forbidden".to_string());

    let token = bearer_token(headers).ok_or_else(forbidden)?;
    let claims = verify_jwt(token, secret).map_err(|_| forbidden())?;

    if !claims.is_admin() {
        tracing::warn!("Non-admin {} called an admin function", claims.sub);
        return Err(forbidden());
    }
    Ok(claims)
}

/// An empty body reads as the default request.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Lists submissions newest first, optionally filtered by completion.
#[utoipa::path(
    post,
    path = "/functions/v1/get-all-submissions",
    request_body = GetSubmissionsRequest,
    responses(
        (status = 200, description = "Submissions ordered by start time, newest first", body = SubmissionsResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Query failed; message echoed")
    )
)]
pub async fn get_all_submissions(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&headers, &config.jwt_secret)?;

    let request: GetSubmissionsRequest = parse_body(&body)?;
    let completed = StatusFilter::completed(StatusFilter::parse(request.status_filter.as_deref()));

    let submissions = sqlx::query_as::<_, SubmissionSummary>(
        r#"
        SELECT
            s.id, s.user_id,
            u.email AS user_email,
            u.user_metadata->>'name' AS user_name,
            s.current_module, s.completed, s.processed,
            s.started_at, s.completed_at
        FROM quiz_submissions s
        LEFT JOIN auth_users u ON u.id = s.user_id
        WHERE ($1::BOOLEAN IS NULL OR s.completed = $1)
        ORDER BY s.started_at DESC
        "#,
    )
    .bind(completed)
    .fetch_all(&pool)
    .await
    .map_err(|e| AppError::from(e).echoed())?;

    Ok(Json(SubmissionsResponse { submissions }))
}

/// Flags one submission as processed.
///
/// Requires no caller identity unless `MARK_PROCESSED_REQUIRES_ADMIN` is set;
/// the write itself always runs with the server's service-role key.
#[utoipa::path(
    post,
    path = "/functions/v1/mark-submission-processed",
    request_body = MarkProcessedRequest,
    responses(
        (status = 200, description = "Submission flagged as processed"),
        (status = 400, description = "submission_id missing or malformed"),
        (status = 404, description = "No such submission"),
        (status = 500, description = "Update failed; message echoed")
    )
)]
pub async fn mark_submission_processed(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if config.mark_processed_requires_admin {
        require_admin(&headers, &config.jwt_secret)?;
    }

    let request: MarkProcessedRequest = parse_body(&body)?;
    let id = parse_submission_id(request.submission_id.as_deref())?;

    let client = PrivilegedClient::service(pool, &config.service_role_key);
    let updated = client
        .mark_submission_processed(id)
        .await
        .map_err(AppError::echoed)?;

    if !updated {
        return Err(AppError::NotFound("Submission not found".to_string()));
    }

    tracing::info!("Submission {} marked as processed", id);
    Ok(Json(json!({ "message": "Submission marked as processed" })))
}

fn parse_submission_id(raw: Option<&str>) -> Result<Uuid, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("submission_id is required".to_string()))?;

    Uuid::parse_str(raw)
        .map_err(|_| AppError::BadRequest("submission_id must be a valid UUID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt::{ROLE_ADMIN, ROLE_USER, sign_jwt};
    use axum::http::{HeaderValue, header};

    const SECRET: &str = "functions_test_secret";

    fn headers_with(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn require_admin_rejects_missing_invalid_and_non_admin_tokens() {
        assert!(matches!(require_admin(&HeaderMap::new(), SECRET), Err(AppError::Forbidden(_))));
        assert!(matches!(
            require_admin(&headers_with("garbage"), SECRET),
            Err(AppError::Forbidden(_))
        ));

        let user = sign_jwt(Uuid::new_v4(), "u@x.com", ROLE_USER, SECRET, 60).unwrap();
        assert!(matches!(require_admin(&headers_with(&user), SECRET), Err(AppError::Forbidden(_))));

        let admin = sign_jwt(Uuid::new_v4(), "a@x.com", ROLE_ADMIN, SECRET, 60).unwrap();
        assert!(require_admin(&headers_with(&admin), SECRET).is_ok());
    }

    #[test]
    fn empty_body_is_the_default_request() {
        let req: GetSubmissionsRequest = parse_body(&Bytes::new()).unwrap();
        assert!(req.status_filter.is_none());

        let req: MarkProcessedRequest = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(req.submission_id.is_none());
    }

    #[test]
    fn malformed_body_is_a_bad_request() {
        let result: Result<GetSubmissionsRequest, _> = parse_body(&Bytes::from_static(b"{oops"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn submission_id_must_be_present_and_a_uuid() {
        assert!(matches!(parse_submission_id(None), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_submission_id(Some("  ")), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_submission_id(Some("42")), Err(AppError::BadRequest(_))));

        let id = Uuid::new_v4();
        assert_eq!(parse_submission_id(Some(&id.to_string())).unwrap(), id);
    }
}
