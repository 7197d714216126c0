// src/services/assignment.rs

use crate::{
    error::AppResult,
    models::assignment::{Assignment, AssignmentCreated, AssignmentFilter, AssignmentView},
    store::ExamStore,
};

/// Assigns `exam_id` to `user_id` and opens its attempt in `assigned` state.
///
/// A repeated call for the same pair fails with `DuplicateAssignment`; it is
/// never treated as a silent success.
pub async fn assign_exam(
    store: &dyn ExamStore,
    user_id: i64,
    exam_id: i64,
) -> AppResult<AssignmentCreated> {
    let created = store.create_assignment(user_id, exam_id).await?;
    tracing::info!(
        "Assigned exam {} to user {} (assignment {}, attempt {})",
        exam_id,
        user_id,
        created.assignment.id,
        created.attempt.id
    );
    Ok(created)
}

/// Removes an assignment whose attempt has not been started.
pub async fn unassign_exam(
    store: &dyn ExamStore,
    user_id: i64,
    exam_id: i64,
) -> AppResult<Assignment> {
    let removed = store.delete_assignment(user_id, exam_id).await?;
    tracing::info!("Unassigned exam {} from user {}", exam_id, user_id);
    Ok(removed)
}

pub async fn list_assignments(
    store: &dyn ExamStore,
    filter: &AssignmentFilter,
) -> AppResult<Vec<AssignmentView>> {
    store.list_assignments(filter).await
}
