// src/services/user.rs

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUserRequest, Role, User},
    store::ExamStore,
};

pub async fn create_user(store: &dyn ExamStore, req: &CreateUserRequest) -> AppResult<User> {
    let user = store.create_user(req.username.trim(), req.role).await?;
    tracing::info!("Created user {} ({}) with role {}", user.id, user.username, user.role);
    Ok(user)
}

pub async fn get_user(store: &dyn ExamStore, id: i64) -> AppResult<User> {
    store
        .find_user(id)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// The only way a role changes after creation.
/// An admin may not demote themselves, so at least one admin always remains reachable.
pub async fn update_user_role(
    store: &dyn ExamStore,
    acting_user_id: i64,
    id: i64,
    role: Role,
) -> AppResult<User> {
    if id == acting_user_id && role != Role::Admin {
        return Err(AppError::Validation("Cannot demote yourself".to_string()));
    }

    let user = store
        .update_user_role(id, role)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;
    tracing::info!("User {} role changed to {} by {}", id, role, acting_user_id);
    Ok(user)
}

/// Creates the configured admin record if it does not exist yet.
pub async fn seed_admin_user(store: &dyn ExamStore, username: &str) -> AppResult<()> {
    if store.find_user_by_username(username).await?.is_none() {
        tracing::info!("Seeding admin user: {}", username);
        store.create_user(username, Role::Admin).await?;
        tracing::info!("Admin user created successfully.");
    }
    Ok(())
}
