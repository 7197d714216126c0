// src/models/stats.rs

use serde::{Deserialize, Serialize};

/// Per-user summary derived from the user's attempts. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserExamStats {
    pub total_assigned_exams: i64,
    pub total_completed_exams: i64,
    pub total_in_progress_exams: i64,
    pub total_terminated_exams: i64,

    /// Mean score of completed attempts; 0 when there are none.
    pub average_score: f64,

    /// Best score of completed attempts; 0 when there are none.
    pub highest_score: i32,
}
