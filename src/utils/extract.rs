// src/utils/extract.rs

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// Maps an axum rejection onto `AppError`, keeping server-side faults as 500s.
fn rejection(status: StatusCode, text: String) -> AppError {
    if status.is_server_error() {
        AppError::InternalServerError(text)
    } else {
        AppError::Validation(text)
    }
}

/// JSON body extractor that also runs `validator` rules.
///
/// Both malformed JSON and rule violations are rejected as
/// `AppError::Validation` before the handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|r| rejection(r.status(), r.body_text()))?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Like `ValidatedJson`, but an empty body yields `T::default()`.
///
/// Used where every field of the payload is optional, so clients may post
/// without a body or a content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: DeserializeOwned + Validate + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|r| rejection(r.status(), r.body_text()))?;

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            T::default()
        } else {
            let Json(value) =
                Json::<T>::from_bytes(&bytes).map_err(|r| rejection(r.status(), r.body_text()))?;
            value
        };
        value.validate()?;
        Ok(OptionalValidatedJson(value))
    }
}

/// `Path` whose rejections render as `AppError` JSON.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|r| rejection(r.status(), r.body_text()))?;
        Ok(ApiPath(value))
    }
}

/// `Query` whose rejections render as `AppError` JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|r| rejection(r.status(), r.body_text()))?;
        Ok(ApiQuery(value))
    }
}
