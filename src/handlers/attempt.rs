// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::attempt::{SubmitAttemptRequest, TerminateAttemptRequest},
    services::attempt,
    store::ExamStore,
    utils::{
        extract::{ApiPath, OptionalValidatedJson, ValidatedJson},
        jwt::Session,
    },
};

/// `startAttempt`: the candidate begins an assigned exam.
pub async fn start_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempt::start_attempt(store.as_ref(), &session, id).await?))
}

/// Questions of a running attempt, with correct answers hidden.
pub async fn get_paper(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(attempt::get_attempt_paper(store.as_ref(), &session, id).await?))
}

/// `submitAttempt`: marks the answers and completes the attempt.
pub async fn submit_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(payload): ValidatedJson<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = attempt::submit_attempt(store.as_ref(), &session, id, &payload.answers).await?;
    Ok(Json(result))
}

/// `terminateAttempt`: reported by the exam client on a monitoring violation.
pub async fn terminate_attempt(
    State(store): State<Arc<dyn ExamStore>>,
    Extension(session): Extension<Session>,
    ApiPath(id): ApiPath<i64>,
    OptionalValidatedJson(payload): OptionalValidatedJson<TerminateAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let terminated = attempt::terminate_attempt(store.as_ref(), &session, id, payload.reason).await?;
    Ok(Json(terminated))
}
