// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Column list matching `QuizSubmission`, for `SELECT` and `RETURNING`.
pub const SUBMISSION_COLUMNS: &str =
    "id, user_id, current_module, completed, processed, started_at, completed_at";

/// Represents the 'quiz_submissions' table.
/// One row per user per assessment attempt.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub current_module: i32,
    pub completed: bool,
    pub processed: bool,
    pub started_at: DateTime<Utc>,
    /// Always set when `completed` is true (enforced by a table CHECK).
    pub completed_at: Option<DateTime<Utc>>,
}

/// Submission row joined with its owner, as returned to admins.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub current_module: i32,
    pub completed: bool,
    pub processed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Represents the 'quiz_answers' table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizAnswer {
    pub question_id: Uuid,
    pub answer: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// An answer next to the question it belongs to, for admin review.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct AnswerReview {
    pub module_order: i32,
    pub module_title: String,
    pub question_id: Uuid,
    pub question_order: i32,
    pub question_text: String,
    pub answer: Option<i32>,
    pub answer_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionWithAnswers<A> {
    #[serde(flatten)]
    pub submission: QuizSubmission,
    pub answers: Vec<A>,
}

/// Optional filter accepted by the submission listing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Complete,
    Incomplete,
}

impl StatusFilter {
    /// `complete` / `incomplete`; any other value means no filter.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            Some("complete") => Some(StatusFilter::Complete),
            Some("incomplete") => Some(StatusFilter::Incomplete),
            _ => None,
        }
    }

    /// Value bound to the `completed` column, `None` for no filter.
    pub fn completed(filter: Option<Self>) -> Option<bool> {
        filter.map(|f| f == StatusFilter::Complete)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetSubmissionsRequest {
    /// `complete` | `incomplete`; omitted means all.
    pub status_filter: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmissionsResponse {
    pub submissions: Vec<SubmissionSummary>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MarkProcessedRequest {
    /// Accepted as a string so a malformed id is a 400, not a decode failure.
    pub submission_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub question_id: Uuid,
    /// Option value; `null` clears the answer.
    pub answer: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(range(min = 1, max = 100))]
    pub current_module: i32,
}
