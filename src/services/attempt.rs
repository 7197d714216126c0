// src/services/attempt.rs

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::{Attempt, AttemptAction, AttemptStatus, AttemptUpdate, SubmitAttemptResponse},
        exam::PublicExam,
    },
    services::{exam::get_exam, scoring::score_answers},
    store::ExamStore,
    utils::jwt::Session,
};

async fn load_attempt(store: &dyn ExamStore, id: i64) -> AppResult<Attempt> {
    store
        .find_attempt(id)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))
}

/// Loads an attempt that only its candidate may act on.
async fn load_own_attempt(store: &dyn ExamStore, session: &Session, id: i64) -> AppResult<Attempt> {
    let attempt = load_attempt(store, id).await?;
    if attempt.user_id != session.user_id {
        return Err(AppError::Forbidden(
            "Attempt belongs to another user".to_string(),
        ));
    }
    Ok(attempt)
}

/// Checks `update` against the state machine and persists it.
///
/// The store applies the update only if the attempt is still in the expected
/// status; losing that race is reported as `InvalidTransition` against the
/// status found afterwards.
async fn transition(
    store: &dyn ExamStore,
    attempt: &Attempt,
    update: AttemptUpdate,
) -> AppResult<Attempt> {
    let action = update.action();
    if attempt.status.transition(action).is_none() {
        return Err(AppError::InvalidTransition {
            attempt_id: attempt.id,
            from: attempt.status,
            action,
        });
    }

    match store.apply_attempt_update(attempt.id, &update).await? {
        Some(updated) => {
            tracing::info!(
                "Attempt {} moved {} -> {}",
                attempt.id,
                attempt.status,
                updated.status
            );
            Ok(updated)
        }
        None => {
            let current = load_attempt(store, attempt.id).await?;
            tracing::warn!(
                "Attempt {} changed concurrently to {} before {}",
                attempt.id,
                current.status,
                action
            );
            Err(AppError::InvalidTransition {
                attempt_id: attempt.id,
                from: current.status,
                action,
            })
        }
    }
}

/// `assigned -> in_progress`, triggered by the candidate.
pub async fn start_attempt(store: &dyn ExamStore, session: &Session, id: i64) -> AppResult<Attempt> {
    let attempt = load_own_attempt(store, session, id).await?;
    transition(store, &attempt, AttemptUpdate::Start { at: Utc::now() }).await
}

/// Returns the paper of a running attempt, without correctness flags.
pub async fn get_attempt_paper(
    store: &dyn ExamStore,
    session: &Session,
    id: i64,
) -> AppResult<PublicExam> {
    let attempt = load_own_attempt(store, session, id).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::Conflict(format!(
            "Attempt {} is {}; start it before fetching the paper",
            attempt.id, attempt.status
        )));
    }
    let exam = get_exam(store, attempt.exam_id).await?;
    Ok(PublicExam::from(exam))
}

/// `in_progress -> completed`, recording the computed score.
///
/// Answers are marked before anything is written, so malformed answers leave
/// the attempt untouched.
pub async fn submit_attempt(
    store: &dyn ExamStore,
    session: &Session,
    id: i64,
    answers: &HashMap<i64, i64>,
) -> AppResult<SubmitAttemptResponse> {
    let attempt = load_own_attempt(store, session, id).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InvalidTransition {
            attempt_id: attempt.id,
            from: attempt.status,
            action: AttemptAction::Submit,
        });
    }

    let exam = get_exam(store, attempt.exam_id).await?;
    let sheet = score_answers(&exam, answers)?;

    let update = AttemptUpdate::Complete {
        at: Utc::now(),
        score: sheet.score,
    };
    let attempt = transition(store, &attempt, update).await?;

    Ok(SubmitAttemptResponse {
        attempt,
        score: sheet.score,
        total_mark: sheet.total_mark,
        correct_count: sheet.correct_count,
        percentage: sheet.percentage,
        passed: sheet.passed,
    })
}

/// `in_progress -> terminated`. The candidate's own session reports
/// monitoring violations; admins may terminate any attempt. No score is kept.
pub async fn terminate_attempt(
    store: &dyn ExamStore,
    session: &Session,
    id: i64,
    reason: Option<String>,
) -> AppResult<Attempt> {
    let attempt = load_attempt(store, id).await?;
    session.ensure_owner_or_admin(attempt.user_id)?;

    let update = AttemptUpdate::Terminate {
        at: Utc::now(),
        reason,
    };
    transition(store, &attempt, update).await
}
