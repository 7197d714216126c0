// src/handlers/profile.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{assignment::AssignmentFilter, attempt::AttemptStatus},
    services::{assignment, stats, user},
    store::ExamStore,
    utils::{extract::ApiQuery, jwt::Session},
};

#[derive(Debug, Deserialize)]
pub struct MyAssignmentsParams {
    pub status: Option<AttemptStatus>,
}

/// Get current user's record.
pub async fn get_me(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(user::get_user(store.as_ref(), session.user_id).await?))
}

/// List exams assigned to the current user, with attempt status.
pub async fn list_my_assignments(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiQuery(params): ApiQuery<MyAssignmentsParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = AssignmentFilter {
        user_id: Some(session.user_id),
        exam_id: None,
        status: params.status,
    };
    Ok(Json(assignment::list_assignments(store.as_ref(), &filter).await?))
}

/// Summary counts and scores of the current user.
pub async fn get_my_stats(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(stats::get_user_exam_stats(store.as_ref(), session.user_id).await?))
}
