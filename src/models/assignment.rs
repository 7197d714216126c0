// src/models/assignment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::attempt::{Attempt, AttemptStatus};

/// Represents the 'assignments' table: one row per (user, exam) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of assigning an exam: the link plus its initial attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentCreated {
    pub assignment: Assignment,
    pub attempt: Attempt,
}

/// Aggregated row for listing assignments.
/// Joined from `assignments`, `exams` and `attempts`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentView {
    pub assignment_id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub certification_name: String,
    pub total_mark: i32,
    pub pass_mark: i32,
    pub assigned_at: DateTime<Utc>,
    pub attempt_id: i64,
    pub status: AttemptStatus,
    pub score: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// DTO for `assignExam`.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignExamRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub exam_id: i64,
}

/// Query parameters for listing assignments. All filters are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentFilter {
    pub user_id: Option<i64>,
    pub exam_id: Option<i64>,
    pub status: Option<AttemptStatus>,
}

impl AssignmentFilter {
    pub fn matches(&self, view: &AssignmentView) -> bool {
        self.user_id.is_none_or(|id| id == view.user_id)
            && self.exam_id.is_none_or(|id| id == view.exam_id)
            && self.status.is_none_or(|s| s == view.status)
    }
}
