// src/services/stats.rs

use crate::{
    error::{AppError, AppResult},
    models::{
        attempt::{Attempt, AttemptStatus},
        stats::UserExamStats,
    },
    store::ExamStore,
};

/// Folds a user's attempts into summary counts and scores.
///
/// Averages and maxima only consider completed attempts with a score, so an
/// empty set yields zeros instead of NaN.
pub fn aggregate(attempts: &[Attempt]) -> UserExamStats {
    let mut stats = UserExamStats {
        total_assigned_exams: attempts.len() as i64,
        ..Default::default()
    };

    let mut score_sum: i64 = 0;
    let mut scored: i64 = 0;

    for attempt in attempts {
        match attempt.status {
            AttemptStatus::Assigned => {}
            AttemptStatus::InProgress => stats.total_in_progress_exams += 1,
            AttemptStatus::Terminated => stats.total_terminated_exams += 1,
            AttemptStatus::Completed => {
                stats.total_completed_exams += 1;
                if let Some(score) = attempt.score {
                    score_sum += score as i64;
                    scored += 1;
                    stats.highest_score = stats.highest_score.max(score);
                }
            }
        }
    }

    if scored > 0 {
        stats.average_score = score_sum as f64 / scored as f64;
    }
    stats
}

pub async fn get_user_exam_stats(store: &dyn ExamStore, user_id: i64) -> AppResult<UserExamStats> {
    if store.find_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    let attempts = store.list_user_attempts(user_id).await?;
    Ok(aggregate(&attempts))
}
