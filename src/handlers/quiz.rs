// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::{QuizModule, QuizOption, QuizQuestion, assemble_hierarchy},
        submission::{
            ProgressRequest, QuizAnswer, QuizSubmission, SUBMISSION_COLUMNS, SaveAnswerRequest,
            SubmissionWithAnswers,
        },
    },
    utils::jwt::Claims,
};

/// Returns the whole questionnaire, ordered at every level.
pub async fn list_modules(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let modules = sqlx::query_as::<_, QuizModule>(
        "SELECT id, title, description, order_number FROM quiz_modules ORDER BY order_number",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz modules: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let questions = sqlx::query_as::<_, QuizQuestion>(
        "SELECT id, module_id, question_text, order_number FROM quiz_questions",
    )
    .fetch_all(&pool)
    .await?;

    let options = sqlx::query_as::<_, QuizOption>(
        "SELECT id, question_id, option_text, value, order_number FROM quiz_options",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(assemble_hierarchy(modules, questions, options)))
}

/// Resumes the caller's open submission, or starts a new one.
pub async fn start_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let open = sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions
         WHERE user_id = $1 AND completed = FALSE
         ORDER BY started_at DESC
         LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    if let Some(submission) = open {
        return Ok((StatusCode::OK, Json(submission)));
    }

    let submission = sqlx::query_as::<_, QuizSubmission>(&format!(
        "INSERT INTO quiz_submissions (user_id) VALUES ($1) RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!("User {} started submission {}", user_id, submission.id);
    Ok((StatusCode::CREATED, Json(submission)))
}

/// The caller's most recent submission together with its answers.
pub async fn current_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let submission = sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions
         WHERE user_id = $1
         ORDER BY started_at DESC
         LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("No submission found".to_string()))?;

    let answers = sqlx::query_as::<_, QuizAnswer>(
        "SELECT question_id, answer, updated_at FROM quiz_answers WHERE submission_id = $1",
    )
    .bind(submission.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SubmissionWithAnswers {
        submission,
        answers,
    }))
}

async fn fetch_open_submission(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<QuizSubmission, AppError> {
    let submission = sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    if submission.completed {
        return Err(AppError::BadRequest("Submission is already completed".to_string()));
    }
    Ok(submission)
}

/// Saves (or clears) one answer of an open submission.
pub async fn save_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let submission = fetch_open_submission(&pool, id, claims.user_id()?).await?;

    let valid = match payload.answer {
        Some(value) => sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM quiz_options WHERE question_id = $1 AND value = $2)",
        )
        .bind(payload.question_id)
        .bind(value)
        .fetch_one(&pool)
        .await?,
        None => sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM quiz_questions WHERE id = $1)",
        )
        .bind(payload.question_id)
        .fetch_one(&pool)
        .await?,
    };

    if !valid {
        return Err(AppError::BadRequest(
            "Answer does not match any option of the question".to_string(),
        ));
    }

    let answer = sqlx::query_as::<_, QuizAnswer>(
        r#"
        INSERT INTO quiz_answers (submission_id, question_id, answer)
        VALUES ($1, $2, $3)
        ON CONFLICT (submission_id, question_id) DO UPDATE SET
            answer = EXCLUDED.answer,
            updated_at = NOW()
        RETURNING question_id, answer, updated_at
        "#,
    )
    .bind(submission.id)
    .bind(payload.question_id)
    .bind(payload.answer)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(answer))
}

/// Records which module the user is on.
pub async fn update_progress(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let submission = fetch_open_submission(&pool, id, claims.user_id()?).await?;

    let updated = sqlx::query_as::<_, QuizSubmission>(&format!(
        "UPDATE quiz_submissions SET current_module = $1 WHERE id = $2 RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(payload.current_module)
    .bind(submission.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Marks a submission completed. `completed_at` is set in the same statement.
/// Completing an already completed submission returns it unchanged.
pub async fn complete_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let completed = sqlx::query_as::<_, QuizSubmission>(&format!(
        "UPDATE quiz_submissions
         SET completed = TRUE, completed_at = NOW()
         WHERE id = $1 AND user_id = $2 AND completed = FALSE
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    if let Some(submission) = completed {
        tracing::info!("Submission {} completed", submission.id);
        return Ok(Json(submission));
    }

    let existing = sqlx::query_as::<_, QuizSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(existing))
}
