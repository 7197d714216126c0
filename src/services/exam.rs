// src/services/exam.rs

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::exam::{CreateExamRequest, Exam, ExamSummary},
    store::ExamStore,
    utils::html::clean_html,
};

/// Validates and persists a new exam.
///
/// Admin-authored text is sanitised first; the shape rules are re-checked
/// afterwards because sanitising may empty a field.
pub async fn create_exam(store: &dyn ExamStore, req: &CreateExamRequest) -> AppResult<Exam> {
    let mut clean = req.clone();
    clean.certification_name = clean_html(clean.certification_name.trim());
    for question in &mut clean.questions {
        question.text = clean_html(question.text.trim());
        for option in &mut question.options {
            option.text = clean_html(option.text.trim());
        }
    }
    clean.validate()?;

    let exam = store.create_exam(&clean).await?;
    debug_assert_eq!(exam.total_mark, exam.marks_sum());

    tracing::info!(
        "Created exam {} '{}' with {} questions (total mark {})",
        exam.id,
        exam.certification_name,
        exam.questions.len(),
        exam.total_mark
    );
    Ok(exam)
}

pub async fn get_exam(store: &dyn ExamStore, id: i64) -> AppResult<Exam> {
    store
        .find_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

pub async fn list_exams(store: &dyn ExamStore) -> AppResult<Vec<ExamSummary>> {
    store.list_exams().await
}

/// Deletion is blocked while the exam has assignments; unassign first.
pub async fn delete_exam(store: &dyn ExamStore, id: i64) -> AppResult<()> {
    store.delete_exam(id).await?;
    tracing::info!("Deleted exam {}", id);
    Ok(())
}
