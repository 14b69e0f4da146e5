// src/seed/mod.rs

//! Quiz content recovery.
//!
//! Re-creates the module → question → option hierarchy from `definition::QUIZ`.
//! Rows are upserted by their order numbers, so question ids (and the answers
//! pointing at them) survive a re-run. Rows beyond the definition are removed.
//! The whole run is one transaction: on failure nothing changes.

pub mod definition;

use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use definition::{EXPECTED_MODULES, EXPECTED_QUESTIONS, QUIZ};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecoveryReport {
    pub success: bool,
    pub message: String,
    pub modules: i64,
    pub questions: i64,
    pub options: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecoveryReport {
    fn failed(err: &AppError) -> Self {
        Self {
            success: false,
            message: "Falha ao recuperar o quiz".to_string(),
            modules: 0,
            questions: 0,
            options: 0,
            error: Some(err.message().to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    modules: i64,
    questions: i64,
    options: i64,
}

/// Runs the recovery and always returns a report.
pub async fn run_recovery(pool: &PgPool) -> RecoveryReport {
    match recover_quiz(pool).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Quiz recovery failed: {}", e);
            RecoveryReport::failed(&e)
        }
    }
}

/// Brings the quiz tables in line with the fixed definition.
pub async fn recover_quiz(pool: &PgPool) -> Result<RecoveryReport, AppError> {
    let before = count_rows(pool).await?;
    tracing::info!(
        "Recovering quiz content (found {} modules, {} questions, {} options)",
        before.modules,
        before.questions,
        before.options
    );

    let mut tx = pool.begin().await?;

    for (module_index, module) in QUIZ.iter().enumerate() {
        let module_order = position(module_index);
        let module_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO quiz_modules (title, description, order_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_number) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description
            RETURNING id
            "#,
        )
        .bind(module.title)
        .bind(module.description)
        .bind(module_order)
        .fetch_one(&mut *tx)
        .await?;

        for (question_index, question) in module.questions.iter().enumerate() {
            let question_order = position(question_index);
            let question_id = sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO quiz_questions (module_id, question_text, order_number)
                VALUES ($1, $2, $3)
                ON CONFLICT (module_id, order_number) DO UPDATE SET
                    question_text = EXCLUDED.question_text
                RETURNING id
                "#,
            )
            .bind(module_id)
            .bind(question.text)
            .bind(question_order)
            .fetch_one(&mut *tx)
            .await?;

            let labels = question.scale.options();
            for (option_index, label) in labels.iter().enumerate() {
                let option_order = position(option_index);
                sqlx::query(
                    r#"
                    INSERT INTO quiz_options (question_id, option_text, value, order_number)
                    VALUES ($1, $2, $3, $3)
                    ON CONFLICT (question_id, order_number) DO UPDATE SET
                        option_text = EXCLUDED.option_text,
                        value = EXCLUDED.value
                    "#,
                )
                .bind(question_id)
                .bind(*label)
                .bind(option_order)
                .execute(&mut *tx)
                .await?;
            }

            prune(&mut tx, "quiz_options", "question_id", question_id, labels.len()).await?;
        }

        prune(&mut tx, "quiz_questions", "module_id", module_id, module.questions.len()).await?;
    }

    sqlx::query("DELETE FROM quiz_modules WHERE order_number < 1 OR order_number > $1")
        .bind(position(QUIZ.len() - 1))
        .execute(&mut *tx)
        .await?;

    let after = count_rows(&mut *tx).await?;
    if after.modules != EXPECTED_MODULES as i64 || after.questions != EXPECTED_QUESTIONS as i64 {
        // Dropping `tx` rolls everything back.
        return Err(AppError::InternalServerError(format!(
            "Recovered hierarchy is incomplete: {} modules, {} questions",
            after.modules, after.questions
        )));
    }

    tx.commit().await?;

    tracing::info!(
        "Quiz recovered: {} modules, {} questions, {} options",
        after.modules,
        after.questions,
        after.options
    );

    Ok(RecoveryReport {
        success: true,
        message: "Quiz recuperado com sucesso".to_string(),
        modules: after.modules,
        questions: after.questions,
        options: after.options,
        error: None,
    })
}

/// Removes children of `parent_id` whose order number falls outside `1..=len`.
async fn prune(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    parent_column: &str,
    parent_id: Uuid,
    len: usize,
) -> Result<(), AppError> {
    let sql = format!(
        "DELETE FROM {table} WHERE {parent_column} = $1 AND (order_number < 1 OR order_number > $2)"
    );
    sqlx::query(&sql)
        .bind(parent_id)
        .bind(len as i32)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn count_rows<'e, E>(executor: E) -> Result<Counts, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let (modules, questions, options) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM quiz_modules),
            (SELECT COUNT(*) FROM quiz_questions),
            (SELECT COUNT(*) FROM quiz_options)
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(Counts {
        modules,
        questions,
        options,
    })
}

fn position(index: usize) -> i32 {
    index as i32 + 1
}
