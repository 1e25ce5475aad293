use serde_json::Value;
use sqlchat::config::ServerConfig;
use sqlchat::server::{handle_request, AppState, HttpRequest, HttpResponse};
use std::sync::Arc;
use tempfile::TempDir;

fn app(dir: &TempDir) -> Arc<AppState> {
    Arc::new(AppState::new(ServerConfig {
        data_dir: dir.path().to_path_buf(),
        ..ServerConfig::default()
    }))
}

fn raw(method: &str, target: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        method,
        target,
        content_type,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

async fn send(state: &Arc<AppState>, method: &str, target: &str, body: &str) -> HttpResponse {
    let request = HttpRequest::parse(&raw(method, target, "application/json", body.as_bytes())).unwrap();
    handle_request(Arc::clone(state), request).await
}

async fn login(state: &Arc<AppState>, username: &str) -> String {
    let resp = send(state, "POST", "/auth/login", &format!(r#"{{"username":"{}"}}"#, username)).await;
    assert_eq!(resp.status, 200);
    let body = resp.body_json().unwrap();
    assert_eq!(body["username"], username);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let resp = send(&state, "GET", "/health", "").await;
    assert_eq!(resp.status, 200);
    let body = resp.body_json().unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_sessions"], 0);
}

#[tokio::test]
async fn test_login_logout_flow() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let session_id = login(&state, "testuser").await;

    let resp = send(&state, "GET", "/health", "").await;
    assert_eq!(resp.body_json().unwrap()["active_sessions"], 1);

    let resp = send(&state, "POST", &format!("/auth/logout?session_id={}", session_id), "").await;
    assert_eq!(resp.status, 200);

    let resp = send(&state, "POST", &format!("/auth/logout?session_id={}", session_id), "").await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn test_login_rejects_empty_username() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let resp = send(&state, "POST", "/auth/login", r#"{"username":""}"#).await;
    assert_eq!(resp.status, 400);
    let resp = send(&state, "POST", "/auth/login", "not json").await;
    assert_eq!(resp.status, 400);
}

#[tokio::test]
async fn test_sample_data_and_chat() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let session_id = login(&state, "testuser").await;

    let resp = send(&state, "POST", &format!("/database/sample-data?session_id={}", session_id), "").await;
    assert_eq!(resp.status, 200);
    let body = resp.body_json().unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["tables_created"], serde_json::json!(["customers", "orders"]));

    let chat_body = format!(r#"{{"message":"What is the total of all orders?","session_id":"{}"}}"#, session_id);
    let resp = send(&state, "POST", "/chat", &chat_body).await;
    assert_eq!(resp.status, 200);
    let body = resp.body_json().unwrap();
    assert_eq!(body["query_executed"], "SELECT SUM(price * quantity) as total_revenue FROM orders");
    assert_eq!(body["error"], Value::Null);
    assert!(body["response"].as_str().unwrap().contains("Result: "));
    assert!(body["results"][0]["total_revenue"].as_f64().unwrap() > 2000.0);
}

#[tokio::test]
async fn test_chat_requires_valid_session() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let resp = send(&state, "POST", "/chat", r#"{"message":"hi","session_id":"nope"}"#).await;
    assert_eq!(resp.status, 401);
    let resp = send(&state, "GET", "/database/info?session_id=nope", "").await;
    assert_eq!(resp.status, 401);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let session_id = login(&state, "quiet").await;

    let body = format!(r#"{{"message":"","session_id":"{}"}}"#, session_id);
    let resp = send(&state, "POST", "/chat", &body).await;
    assert_eq!(resp.status, 400);
    assert_eq!(
        resp.body_json().unwrap()["error"],
        "Invalid request: message must not be empty"
    );
}

#[tokio::test]
async fn test_user_isolation() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let first = login(&state, "user1").await;
    let second = login(&state, "user2").await;

    send(&state, "POST", &format!("/database/sample-data?session_id={}", first), "").await;

    let info1 = send(&state, "GET", &format!("/database/info?session_id={}", first), "").await;
    let info2 = send(&state, "GET", &format!("/database/info?session_id={}", second), "").await;
    assert_eq!(info1.status, 200);
    assert_eq!(info2.status, 200);
    assert_eq!(info1.body_json().unwrap()["tables"], serde_json::json!(["customers", "orders"]));
    assert_eq!(info2.body_json().unwrap()["tables"], serde_json::json!([]));
}

#[tokio::test]
async fn test_multipart_upload_then_schema() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let session_id = login(&state, "uploader").await;

    let body = b"--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"inventory.csv\"\r\nContent-Type: text/csv\r\n\r\nsku,qty\nA1,3\nB2,7\n\r\n--BOUNDARY--\r\n";
    let raw = raw(
        "POST",
        &format!("/database/upload?session_id={}", session_id),
        "multipart/form-data; boundary=BOUNDARY",
        body,
    );
    let resp = handle_request(Arc::clone(&state), HttpRequest::parse(&raw).unwrap()).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_json().unwrap()["tables_created"], serde_json::json!(["inventory"]));

    let resp = send(&state, "GET", &format!("/database/schema?session_id={}", session_id), "").await;
    let schema = resp.body_json().unwrap();
    assert_eq!(schema["tables"], serde_json::json!(["inventory"]));
    assert_eq!(schema["table_schemas"]["inventory"][1]["column"], "qty");
    assert_eq!(schema["table_schemas"]["inventory"][1]["type"], "INTEGER");
}

#[tokio::test]
async fn test_upload_rejects_non_csv() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    let session_id = login(&state, "uploader").await;
    let resp = send(
        &state,
        "POST",
        &format!("/database/upload?session_id={}&filename=notes.txt", session_id),
        "a,b\n1,2\n",
    )
    .await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body_json().unwrap()["error"], "Invalid request: Only CSV files are supported");
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let dir = TempDir::new().unwrap();
    let state = app(&dir);
    assert_eq!(send(&state, "GET", "/nope", "").await.status, 404);
    assert_eq!(send(&state, "GET", "/chat", "").await.status, 405);
    assert_eq!(send(&state, "OPTIONS", "/chat", "").await.status, 204);
}
