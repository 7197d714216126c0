// tests/api_tests.rs

use std::sync::Arc;

use exam_portal::{
    config::Config,
    create_router,
    models::user::Role,
    state::AppState,
    store::{ExamStore, MemoryStore},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

struct TestApp {
    address: String,
    store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestApp {
    async fn token_for(&self, username: &str, role: Role) -> (i64, String) {
        let user = self.store.create_user(username, role).await.unwrap();
        let token = sign_jwt(user.id, role, SECRET, 600).unwrap();
        (user.id, token)
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// POST without a body or content type.
    async fn post_empty(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates an exam whose first option of each question is correct.
    async fn create_exam(&self, admin: &str, name: &str, marks: &[i32]) -> Value {
        let questions: Vec<Value> = marks
            .iter()
            .enumerate()
            .map(|(i, mark)| {
                json!({
                    "text": format!("Question {}", i + 1),
                    "mark": mark,
                    "options": [
                        { "text": "right", "is_correct": true },
                        { "text": "wrong" }
                    ]
                })
            })
            .collect();

        let response = self
            .post(
                "/api/admin/exams",
                admin,
                json!({
                    "certification_name": name,
                    "pass_mark": marks.iter().sum::<i32>() / 2,
                    "questions": questions
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    async fn assign(&self, admin: &str, user_id: i64, exam_id: i64) -> reqwest::Response {
        self.post(
            "/api/admin/assignments",
            admin,
            json!({ "user_id": user_id, "exam_id": exam_id }),
        )
        .await
    }
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
async fn spawn_app() -> TestApp {
    let config = Config {
        database_url: None,
        db_max_connections: 1,
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        admin_username: None,
    };

    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        config,
    };
    let app = create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

fn answers_for(exam: &Value, correct: &[bool]) -> Value {
    let mut answers = serde_json::Map::new();
    for (question, right) in exam["questions"].as_array().unwrap().iter().zip(correct) {
        let option = if *right { 0 } else { 1 };
        answers.insert(
            question["id"].as_i64().unwrap().to_string(),
            question["options"][option]["id"].clone(),
        );
    }
    json!({ "answers": answers })
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn requests_without_session_are_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/api/me/stats", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app.get("/api/me/stats", "not-a-jwt").await;
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn worked_example_stats() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, user) = app.token_for("candidate", Role::User).await;

    let exam_a = app.create_exam(&admin, "A", &[2, 8]).await;
    let exam_b = app.create_exam(&admin, "B", &[20]).await;

    let a: Value = app
        .assign(&admin, user_id, exam_a["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let b: Value = app
        .assign(&admin, user_id, exam_b["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let attempt_a = a["attempt"]["id"].as_i64().unwrap();
    let attempt_b = b["attempt"]["id"].as_i64().unwrap();
    assert_eq!(a["attempt"]["status"], "assigned");

    // Complete A scoring 8 of 10
    let response = app
        .post(&format!("/api/attempts/{}/start", attempt_a), &user, json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let paper: Value = app
        .get(&format!("/api/attempts/{}/paper", attempt_a), &user)
        .await
        .json()
        .await
        .unwrap();
    assert!(paper["questions"][0]["options"][0].get("is_correct").is_none());

    let response = app
        .post(
            &format!("/api/attempts/{}/submit", attempt_a),
            &user,
            answers_for(&exam_a, &[false, true]),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["score"], 8);
    assert_eq!(result["total_mark"], 10);
    assert_eq!(result["passed"], true);
    assert_eq!(result["attempt"]["status"], "completed");

    // Start B and abandon it
    app.post(&format!("/api/attempts/{}/start", attempt_b), &user, json!({}))
        .await;

    let stats: Value = app.get("/api/me/stats", &user).await.json().await.unwrap();
    assert_eq!(stats["total_assigned_exams"], 2);
    assert_eq!(stats["total_completed_exams"], 1);
    assert_eq!(stats["total_in_progress_exams"], 1);
    assert_eq!(stats["total_terminated_exams"], 0);
    assert_eq!(stats["average_score"], 8.0);
    assert_eq!(stats["highest_score"], 8);

    let admin_view: Value = app
        .get(&format!("/api/admin/users/{}/stats", user_id), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(admin_view, stats);

    let mine: Vec<Value> = app
        .get("/api/me/assignments?status=in_progress", &user)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["attempt_id"], attempt_b);
}

#[tokio::test]
async fn stats_without_assignments_are_zero() {
    let app = spawn_app().await;
    let (_, user) = app.token_for("newcomer", Role::User).await;

    let response = app.get("/api/me/stats", &user).await;
    assert_eq!(response.status().as_u16(), 200);
    let stats: Value = response.json().await.unwrap();
    assert_eq!(stats["total_assigned_exams"], 0);
    assert_eq!(stats["average_score"], 0.0);
    assert_eq!(stats["highest_score"], 0);
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, _) = app.token_for("candidate", Role::User).await;
    let exam = app.create_exam(&admin, "A", &[10]).await;
    let exam_id = exam["id"].as_i64().unwrap();

    assert_eq!(app.assign(&admin, user_id, exam_id).await.status().as_u16(), 201);

    let response = app.assign(&admin, user_id, exam_id).await;
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate_assignment");

    let listed: Vec<Value> = app
        .get(&format!("/api/admin/assignments?user_id={}", user_id), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let response = app.assign(&admin, 9999, exam_id).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn skipped_and_terminal_transitions_are_rejected() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, user) = app.token_for("candidate", Role::User).await;
    let exam = app.create_exam(&admin, "A", &[10]).await;
    let created: Value = app
        .assign(&admin, user_id, exam["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let attempt = created["attempt"]["id"].as_i64().unwrap();

    // assigned -> completed is not an edge
    let response = app
        .post(
            &format!("/api/attempts/{}/submit", attempt),
            &user,
            answers_for(&exam, &[true]),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(body["reason"], "not_in_progress");

    app.post(&format!("/api/attempts/{}/start", attempt), &user, json!({}))
        .await;
    let response = app
        .post(&format!("/api/attempts/{}/start", attempt), &user, json!({}))
        .await;
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "already_started");

    let response = app
        .post(
            &format!("/api/attempts/{}/submit", attempt),
            &user,
            answers_for(&exam, &[true]),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    // Terminating a completed attempt leaves the score alone
    let response = app
        .post(
            &format!("/api/admin/attempts/{}/terminate", attempt),
            &admin,
            json!({ "reason": "late flag" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    let stored = app.store.find_attempt(attempt).await.unwrap().unwrap();
    assert_eq!(stored.score, Some(10));
}

#[tokio::test]
async fn monitoring_violation_terminates_attempt() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, user) = app.token_for("candidate", Role::User).await;
    let (_, other) = app.token_for("other", Role::User).await;
    let exam = app.create_exam(&admin, "A", &[10]).await;
    let created: Value = app
        .assign(&admin, user_id, exam["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let attempt = created["attempt"]["id"].as_i64().unwrap();

    app.post(&format!("/api/attempts/{}/start", attempt), &user, json!({}))
        .await;

    let response = app
        .post(
            &format!("/api/attempts/{}/terminate", attempt),
            &other,
            json!({ "reason": "not mine" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .post(
            &format!("/api/attempts/{}/terminate", attempt),
            &user,
            json!({ "reason": "left fullscreen" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "terminated");
    assert_eq!(body["score"], Value::Null);
    assert_eq!(body["termination_reason"], "left fullscreen");

    let stats: Value = app.get("/api/me/stats", &user).await.json().await.unwrap();
    assert_eq!(stats["total_terminated_exams"], 1);
    assert_eq!(stats["average_score"], 0.0);
}

#[tokio::test]
async fn malformed_answers_are_validation_errors() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, user) = app.token_for("candidate", Role::User).await;
    let exam = app.create_exam(&admin, "A", &[10]).await;
    let created: Value = app
        .assign(&admin, user_id, exam["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let attempt = created["attempt"]["id"].as_i64().unwrap();
    app.post(&format!("/api/attempts/{}/start", attempt), &user, json!({}))
        .await;

    let response = app
        .post(
            &format!("/api/attempts/{}/submit", attempt),
            &user,
            json!({ "answers": "everything" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "validation_error");

    let response = app
        .post(
            &format!("/api/attempts/{}/submit", attempt),
            &user,
            json!({ "answers": { "424242": 1 } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let stored = app.store.find_attempt(attempt).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "in_progress");
}

#[tokio::test]
async fn terminate_accepts_an_empty_body() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (user_id, user) = app.token_for("candidate", Role::User).await;
    let exam = app.create_exam(&admin, "A", &[10]).await;
    let exam_id = exam["id"].as_i64().unwrap();
    let created: Value = app.assign(&admin, user_id, exam_id).await.json().await.unwrap();
    let attempt = created["attempt"]["id"].as_i64().unwrap();

    app.post_empty(&format!("/api/attempts/{}/start", attempt), &user)
        .await;

    let response = app
        .post_empty(&format!("/api/attempts/{}/terminate", attempt), &user)
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "terminated");
    assert_eq!(body["termination_reason"], Value::Null);

    // Admin route, second exam
    let other = app.create_exam(&admin, "B", &[10]).await;
    let created: Value = app
        .assign(&admin, user_id, other["id"].as_i64().unwrap())
        .await
        .json()
        .await
        .unwrap();
    let attempt = created["attempt"]["id"].as_i64().unwrap();
    app.post_empty(&format!("/api/attempts/{}/start", attempt), &user)
        .await;

    let response = app
        .post_empty(&format!("/api/admin/attempts/{}/terminate", attempt), &admin)
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let stored = app.store.find_attempt(attempt).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "terminated");
}

#[tokio::test]
async fn malformed_path_and_query_are_validation_errors() {
    let app = spawn_app().await;
    let (_, admin) = app.token_for("admin", Role::Admin).await;
    let (_, user) = app.token_for("candidate", Role::User).await;

    for (path, token) in [
        ("/api/attempts/abc/paper", &user),
        ("/api/me/assignments?status=bogus", &user),
        ("/api/admin/assignments?exam_id=many", &admin),
        ("/api/admin/exams/abc", &admin),
    ] {
        let response = app.get(path, token).await;
        assert_eq!(response.status().as_u16(), 400, "{}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "validation_error", "{}", path);
    }
}
