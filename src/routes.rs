// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, attempt, profile},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Assembles the main application router.
///
/// * Merges all sub-routers (me, attempts, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let me_routes = Router::new()
        .route("/", get(profile::get_me))
        .route("/assignments", get(profile::list_my_assignments))
        .route("/stats", get(profile::get_my_stats));

    let attempt_routes = Router::new()
        .route("/{id}/start", post(attempt::start_attempt))
        .route("/{id}/paper", get(attempt::get_paper))
        .route("/{id}/submit", post(attempt::submit_attempt))
        .route("/{id}/terminate", post(attempt::terminate_attempt));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/users/{id}/stats", get(admin::get_user_stats))
        .route("/exams", get(admin::list_exams).post(admin::create_exam))
        .route("/exams/{id}", get(admin::get_exam).delete(admin::delete_exam))
        .route(
            "/assignments",
            get(admin::list_assignments).post(admin::assign_exam),
        )
        .route(
            "/assignments/{user_id}/{exam_id}",
            delete(admin::unassign_exam),
        )
        .route("/attempts/{id}/terminate", post(admin::terminate_attempt))
        // Admin check runs after authentication (layers apply bottom-up)
        .layer(middleware::from_fn(admin_middleware));

    // Everything below requires a verified session
    let protected = Router::new()
        .nest("/me", me_routes)
        .nest("/attempts", attempt_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .route("/health", get(health))
        .merge(protected);

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
