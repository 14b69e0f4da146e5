// src/models/quiz.rs

use std::collections::HashMap;

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Represents the 'quiz_modules' table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizModule {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_number: i32,
}

/// Represents the 'quiz_questions' table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub module_id: Uuid,
    pub question_text: String,
    pub order_number: i32,
}

/// Represents the 'quiz_options' table.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct QuizOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub value: i32,
    pub order_number: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleWithQuestions {
    #[serde(flatten)]
    pub module: QuizModule,
    pub questions: Vec<QuestionWithOptions>,
}

/// Builds the module → question → option tree from flat rows.
///
/// Every level is sorted by `order_number`. Orphaned rows are dropped.
pub fn assemble_hierarchy(
    mut modules: Vec<QuizModule>,
    questions: Vec<QuizQuestion>,
    options: Vec<QuizOption>,
) -> Vec<ModuleWithQuestions> {
    let mut options_by_question: HashMap<Uuid, Vec<QuizOption>> = HashMap::new();
    for option in options {
        options_by_question.entry(option.question_id).or_default().push(option);
    }

    let mut questions_by_module: HashMap<Uuid, Vec<QuestionWithOptions>> = HashMap::new();
    for question in questions {
        let mut options = options_by_question.remove(&question.id).unwrap_or_default();
        options.sort_by_key(|o| o.order_number);
        questions_by_module
            .entry(question.module_id)
            .or_default()
            .push(QuestionWithOptions { question, options });
    }

    modules.sort_by_key(|m| m.order_number);
    modules
        .into_iter()
        .map(|module| {
            let mut questions = questions_by_module.remove(&module.id).unwrap_or_default();
            questions.sort_by_key(|q| q.question.order_number);
            ModuleWithQuestions { module, questions }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(order: i32) -> QuizModule {
        QuizModule {
            id: Uuid::new_v4(),
            title: format!("Module {}", order),
            description: None,
            order_number: order,
        }
    }

    fn question(module_id: Uuid, order: i32) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            module_id,
            question_text: format!("Q{}", order),
            order_number: order,
        }
    }

    fn option(question_id: Uuid, order: i32) -> QuizOption {
        QuizOption {
            id: Uuid::new_v4(),
            question_id,
            option_text: format!("O{}", order),
            value: order,
            order_number: order,
        }
    }

    #[test]
    fn orders_every_level() {
        let m2 = module(2);
        let m1 = module(1);
        let q_b = question(m1.id, 2);
        let q_a = question(m1.id, 1);
        let options = vec![option(q_a.id, 3), option(q_a.id, 1), option(q_a.id, 2)];

        let tree = assemble_hierarchy(vec![m2, m1], vec![q_b, q_a], options);

        assert_eq!(tree[0].module.order_number, 1);
        assert_eq!(tree[1].module.order_number, 2);
        assert!(tree[1].questions.is_empty());

        let first = &tree[0].questions;
        assert_eq!(first[0].question.order_number, 1);
        assert_eq!(first[1].question.order_number, 2);
        let values: Vec<i32> = first[0].options.iter().map(|o| o.order_number).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(first[1].options.is_empty());
    }

    #[test]
    fn orphans_are_dropped() {
        let m = module(1);
        let stray = question(Uuid::new_v4(), 1);
        let tree = assemble_hierarchy(vec![m], vec![stray], vec![]);
        assert!(tree[0].questions.is_empty());
    }
}
