// src/models/attempt.rs

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Lifecycle state of an attempt.
///
/// `assigned → in_progress → {completed, terminated}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
pub enum AttemptStatus {
    Assigned,
    InProgress,
    Completed,
    Terminated,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::Assigned => "assigned",
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Terminated => "terminated",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Terminated)
    }

    /// Applies `action` to the current status.
    ///
    /// Returns the next status, or `None` when the state machine has no such edge.
    pub fn transition(self, action: AttemptAction) -> Option<AttemptStatus> {
        match (self, action) {
            (AttemptStatus::Assigned, AttemptAction::Start) => Some(AttemptStatus::InProgress),
            (AttemptStatus::InProgress, AttemptAction::Submit) => Some(AttemptStatus::Completed),
            (AttemptStatus::InProgress, AttemptAction::Terminate) => {
                Some(AttemptStatus::Terminated)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action a caller can take on an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptAction {
    Start,
    Submit,
    Terminate,
}

impl AttemptAction {
    /// The status an attempt must be in for this action to apply.
    pub fn required_status(self) -> AttemptStatus {
        match self {
            AttemptAction::Start => AttemptStatus::Assigned,
            AttemptAction::Submit | AttemptAction::Terminate => AttemptStatus::InProgress,
        }
    }

    /// Short reason reported when the action is rejected from `from`.
    pub fn rejection_reason(self, from: AttemptStatus) -> &'static str {
        match self {
            AttemptAction::Start => "already_started",
            AttemptAction::Submit | AttemptAction::Terminate if from.is_terminal() => {
                "attempt_finished"
            }
            AttemptAction::Submit | AttemptAction::Terminate => "not_in_progress",
        }
    }
}

impl fmt::Display for AttemptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttemptAction::Start => "start",
            AttemptAction::Submit => "submit",
            AttemptAction::Terminate => "terminate",
        })
    }
}

/// An attempt row joined with its assignment's user and exam ids.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub status: AttemptStatus,

    /// Sum of marks earned. Only set once the attempt is completed.
    pub score: Option<i32>,

    pub termination_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A state change to persist, guarded by the status it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptUpdate {
    Start {
        at: DateTime<Utc>,
    },
    Complete {
        at: DateTime<Utc>,
        score: i32,
    },
    Terminate {
        at: DateTime<Utc>,
        reason: Option<String>,
    },
}

impl AttemptUpdate {
    pub fn action(&self) -> AttemptAction {
        match self {
            AttemptUpdate::Start { .. } => AttemptAction::Start,
            AttemptUpdate::Complete { .. } => AttemptAction::Submit,
            AttemptUpdate::Terminate { .. } => AttemptAction::Terminate,
        }
    }

    pub fn expected_status(&self) -> AttemptStatus {
        self.action().required_status()
    }

    pub fn target_status(&self) -> AttemptStatus {
        match self {
            AttemptUpdate::Start { .. } => AttemptStatus::InProgress,
            AttemptUpdate::Complete { .. } => AttemptStatus::Completed,
            AttemptUpdate::Terminate { .. } => AttemptStatus::Terminated,
        }
    }

    /// Writes the update into an in-memory attempt.
    pub fn apply_to(&self, attempt: &mut Attempt) {
        attempt.status = self.target_status();
        match self {
            AttemptUpdate::Start { at } => attempt.started_at = Some(*at),
            AttemptUpdate::Complete { at, score } => {
                attempt.completed_at = Some(*at);
                attempt.score = Some(*score);
            }
            AttemptUpdate::Terminate { at, reason } => {
                attempt.completed_at = Some(*at);
                attempt.termination_reason = reason.clone();
            }
        }
    }
}

/// DTO for submitting answers.
/// Key: question id. Value: the chosen option id.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 500))]
    pub answers: HashMap<i64, i64>,
}

/// DTO for terminating an attempt (monitoring violation or admin action).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TerminateAttemptRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: Option<String>,
}

/// Result returned after a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt: Attempt,
    pub score: i32,
    pub total_mark: i32,
    pub correct_count: usize,
    pub percentage: f64,
    pub passed: bool,
}
