// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        assignment::{AssignExamRequest, AssignmentFilter},
        attempt::TerminateAttemptRequest,
        exam::CreateExamRequest,
        user::{CreateUserRequest, UpdateRoleRequest},
    },
    services::{assignment, attempt, exam, stats, user},
    store::ExamStore,
    utils::{
        extract::{ApiPath, ApiQuery, OptionalValidatedJson, ValidatedJson},
        jwt::Session,
    },
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_users().await?))
}

/// Registers a local user record for an identity of the external provider.
/// Admin only.
pub async fn create_user(
    State(store): State<Arc<dyn ExamStore>>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = user::create_user(store.as_ref(), &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Changes a user's role. The only path by which a role changes.
/// Admin only. Admins cannot demote themselves.
pub async fn update_user_role(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = user::update_user_role(store.as_ref(), session.user_id, id, payload.role).await?;
    Ok(Json(updated))
}

/// Summary counts and scores for any user.
pub async fn get_user_stats(
    State(store): State<Arc<dyn ExamStore>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stats::get_user_exam_stats(store.as_ref(), id).await?))
}

/// Creates an exam with its questions and options.
/// Admin only.
pub async fn create_exam(
    State(store): State<Arc<dyn ExamStore>>,
    ValidatedJson(payload): ValidatedJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = exam::create_exam(store.as_ref(), &payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_exams(
    State(store): State<Arc<dyn ExamStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exam::list_exams(store.as_ref()).await?))
}

/// Full exam including correctness flags.
pub async fn get_exam(
    State(store): State<Arc<dyn ExamStore>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(exam::get_exam(store.as_ref(), id).await?))
}

/// Deletes an exam by ID.
/// Returns 409 while the exam is still assigned to anyone.
pub async fn delete_exam(
    State(store): State<Arc<dyn ExamStore>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    exam::delete_exam(store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `assignExam`: links a user to an exam and opens the attempt.
pub async fn assign_exam(
    State(store): State<Arc<dyn ExamStore>>,
    ValidatedJson(payload): ValidatedJson<AssignExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = assignment::assign_exam(store.as_ref(), payload.user_id, payload.exam_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `unassignExam`: only while the attempt has not been started.
pub async fn unassign_exam(
    State(store): State<Arc<dyn ExamStore>>,
    ApiPath((user_id, exam_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    assignment::unassign_exam(store.as_ref(), user_id, exam_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `listAssignments` across all users, filterable by user, exam and status.
pub async fn list_assignments(
    State(store): State<Arc<dyn ExamStore>>,
    ApiQuery(filter): ApiQuery<AssignmentFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(assignment::list_assignments(store.as_ref(), &filter).await?))
}

/// Administrative termination of a running attempt.
pub async fn terminate_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
    OptionalValidatedJson(payload): OptionalValidatedJson<TerminateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let terminated = attempt::terminate_attempt(store.as_ref(), &session, id, payload.reason).await?;
    Ok(Json(terminated))
}
