// src/services/scoring.rs

use std::collections::HashMap;

use crate::{error::AppError, models::exam::Exam};

/// Outcome of marking a submission against an exam.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSheet {
    pub score: i32,
    pub total_mark: i32,
    pub correct_count: usize,
    pub percentage: f64,
    pub passed: bool,
}

/// Marks `answers` (question id -> chosen option id) against `exam`.
///
/// A question earns its full mark when the chosen option is flagged correct.
/// Unanswered questions earn nothing. Answers naming a question outside the
/// exam, or an option of a different question, are rejected.
pub fn score_answers(exam: &Exam, answers: &HashMap<i64, i64>) -> Result<ScoreSheet, AppError> {
    let mut score = 0;
    let mut correct_count = 0;

    for (question_id, option_id) in answers {
        let question = exam.question(*question_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Question {} is not part of exam {}",
                question_id, exam.id
            ))
        })?;

        let option = question.option(*option_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Option {} does not belong to question {}",
                option_id, question_id
            ))
        })?;

        if option.is_correct {
            score += question.mark;
            correct_count += 1;
        }
    }

    let percentage = if exam.total_mark > 0 {
        score as f64 * 100.0 / exam.total_mark as f64
    } else {
        0.0
    };

    Ok(ScoreSheet {
        score,
        total_mark: exam.total_mark,
        correct_count,
        percentage,
        passed: score >= exam.pass_mark,
    })
}
