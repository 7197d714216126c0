// tests/admin_tests.rs

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

const SECRET: &str = "admin_test_secret";

async fn spawn_app() -> (String, Arc<MemoryStore>) {
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
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

async fn login(store: &MemoryStore, username: &str, role: Role) -> (i64, String) {
    let user = store.create_user(username, role).await.unwrap();
    (user.id, sign_jwt(user.id, role, SECRET, 600).unwrap())
}

fn exam_body() -> Value {
    json!({
        "certification_name": "Kubernetes Operator",
        "pass_mark": 5,
        "total_mark": 8,
        "questions": [
            {
                "text": "Which object schedules pods?",
                "mark": 3,
                "options": [
                    { "text": "Deployment", "is_correct": true },
                    { "text": "ConfigMap", "is_correct": false }
                ]
            },
            {
                "text": "Default namespace name?",
                "mark": 5,
                "options": [
                    { "text": "kube-system", "is_correct": false },
                    { "text": "default", "is_correct": true }
                ]
            }
        ]
    })
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, user) = login(&store, "plain", Role::User).await;

    let response = client
        .get(format!("{}/api/admin/exams", address))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "forbidden");
}

#[tokio::test]
async fn exam_crud_and_deletion_policy() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin) = login(&store, "root", Role::Admin).await;
    let (user_id, _) = login(&store, "candidate", Role::User).await;

    let response = client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(&admin)
        .json(&exam_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let exam: Value = response.json().await.unwrap();
    let exam_id = exam["id"].as_i64().unwrap();
    assert_eq!(exam["total_mark"], 8);
    assert_eq!(exam["questions"][1]["options"][1]["text"], "default");
    assert_eq!(exam["questions"][1]["options"][1]["is_correct"], true);

    let list: Vec<Value> = client
        .get(format!("{}/api/admin/exams", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["question_count"], 2);

    client
        .post(format!("{}/api/admin/assignments", address))
        .bearer_auth(&admin)
        .json(&json!({ "user_id": user_id, "exam_id": exam_id }))
        .send()
        .await
        .unwrap();

    // Blocked while assigned
    let response = client
        .delete(format!("{}/api/admin/exams/{}", address, exam_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .delete(format!(
            "{}/api/admin/assignments/{}/{}",
            address, user_id, exam_id
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .delete(format!("{}/api/admin/exams/{}", address, exam_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/admin/exams/{}", address, exam_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn invalid_exams_are_rejected_before_storage() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin) = login(&store, "root", Role::Admin).await;

    let mut no_correct = exam_body();
    no_correct["questions"][0]["options"][0]["is_correct"] = json!(false);

    let mut wrong_total = exam_body();
    wrong_total["total_mark"] = json!(9);

    let mut negative_mark = exam_body();
    negative_mark["questions"][0]["mark"] = json!(-3);
    negative_mark["total_mark"] = Value::Null;

    for body in [no_correct, wrong_total, negative_mark] {
        let response = client
            .post(format!("{}/api/admin/exams", address))
            .bearer_auth(&admin)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["kind"], "validation_error");
    }

    assert!(store.list_exams().await.unwrap().is_empty());
}

#[tokio::test]
async fn unassign_after_start_is_rejected() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, admin) = login(&store, "root", Role::Admin).await;
    let (user_id, user) = login(&store, "candidate", Role::User).await;

    let exam: Value = client
        .post(format!("{}/api/admin/exams", address))
        .bearer_auth(&admin)
        .json(&exam_body())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    let created: Value = client
        .post(format!("{}/api/admin/assignments", address))
        .bearer_auth(&admin)
        .json(&json!({ "user_id": user_id, "exam_id": exam_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let attempt_id = created["attempt"]["id"].as_i64().unwrap();

    client
        .post(format!("{}/api/attempts/{}/start", address, attempt_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();

    let response = client
        .delete(format!(
            "{}/api/admin/assignments/{}/{}",
            address, user_id, exam_id
        ))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "attempt_in_progress");
}

#[tokio::test]
async fn user_management() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let (admin_id, admin) = login(&store, "root", Role::Admin).await;

    let response = client
        .post(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .json(&json!({ "username": "newhire" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["role"], "user");

    let response = client
        .post(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .json(&json!({ "username": "newhire" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let response = client
        .post(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .json(&json!({ "username": "yo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = client
        .put(format!(
            "{}/api/admin/users/{}/role",
            address,
            created["id"].as_i64().unwrap()
        ))
        .bearer_auth(&admin)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let promoted: Value = response.json().await.unwrap();
    assert_eq!(promoted["role"], "admin");

    let response = client
        .put(format!("{}/api/admin/users/{}/role", address, admin_id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let users: Vec<Value> = client
        .get(format!("{}/api/admin/users", address))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 2);
}
