// src/docs.rs

use axum::Json;
use utoipa::OpenApi;

use crate::{
    handlers::{functions, maintenance},
    models::{
        config_result::{ConfigResult, ServiceRoleRequest, ServiceRoleStatus},
        submission::{
            GetSubmissionsRequest, MarkProcessedRequest, SubmissionSummary, SubmissionsResponse,
        },
        user::{ImportReport, UserProfile},
    },
    seed::RecoveryReport,
};

/// OpenAPI description of the externally consumed endpoints.
#[derive(OpenApi)]
#[openapi(
    info(title = "MAR Assessment API"),
    paths(
        functions::get_all_submissions,
        functions::mark_submission_processed,
        maintenance::recover_quiz_with_key,
    ),
    components(schemas(
        ConfigResult,
        GetSubmissionsRequest,
        ImportReport,
        MarkProcessedRequest,
        RecoveryReport,
        ServiceRoleRequest,
        ServiceRoleStatus,
        SubmissionSummary,
        SubmissionsResponse,
        UserProfile,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
