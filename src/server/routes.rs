//! Request routing and endpoint handlers.

use super::http::{multipart_file, HttpRequest, HttpResponse};
use super::AppState;
use crate::db::{create_sample_data, upload_csv_bytes, SqliteStorage};
use crate::error::{ChatError, Result};
use crate::models::{
    ChatRequest, ChatResponse, ErrorResponse, HealthResponse, LoginRequest, LoginResponse,
    UploadResponse,
};
use crate::session::{lock_assistant, SharedAssistant};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub async fn handle_request(state: Arc<AppState>, request: HttpRequest) -> HttpResponse {
    debug!("Request: {} {}", request.method, request.path);

    let result = match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => Ok(HttpResponse::no_content()),
        ("GET", "/") => Ok(service_descriptor()),
        ("GET", "/health") => Ok(health(&state)),
        ("POST", "/auth/login") => login(&state, &request),
        ("POST", "/auth/logout") => logout(&state, &request),
        ("POST", "/chat") => chat(state, &request).await,
        ("GET", "/database/schema") => database_schema(state, &request).await,
        ("GET", "/database/info") => database_info(state, &request).await,
        ("POST", "/database/upload") => upload(state, &request).await,
        ("POST", "/database/sample-data") => sample_data(state, &request).await,
        (
            _,
            "/" | "/health" | "/auth/login" | "/auth/logout" | "/chat" | "/database/schema"
            | "/database/info" | "/database/upload" | "/database/sample-data",
        ) => Ok(method_not_allowed()),
        _ => Ok(not_found()),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

pub fn error_response(err: &ChatError) -> HttpResponse {
    let status = err.status_code();
    if status >= 500 {
        warn!("Request failed: {}", err);
    }
    HttpResponse::json(
        status,
        &ErrorResponse {
            error: err.to_string(),
            detail: None,
        },
    )
}

fn not_found() -> HttpResponse {
    HttpResponse::json(
        404,
        &ErrorResponse {
            error: "Not Found".to_string(),
            detail: None,
        },
    )
}

fn method_not_allowed() -> HttpResponse {
    HttpResponse::json(
        405,
        &ErrorResponse {
            error: "Method Not Allowed".to_string(),
            detail: None,
        },
    )
}

fn service_descriptor() -> HttpResponse {
    HttpResponse::json(
        200,
        &serde_json::json!({
            "service": "sqlchat",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": [
                "POST /auth/login",
                "POST /auth/logout",
                "POST /chat",
                "GET /database/schema",
                "GET /database/info",
                "POST /database/upload",
                "POST /database/sample-data",
                "GET /health"
            ]
        }),
    )
}

fn health(state: &AppState) -> HttpResponse {
    let active = state.sessions.active_sessions_count();
    HttpResponse::json(
        200,
        &HealthResponse {
            status: "healthy".to_string(),
            active_sessions: active,
            // one assistant per live session
            active_agents: active,
        },
    )
}

fn login(state: &AppState, request: &HttpRequest) -> Result<HttpResponse> {
    let req: LoginRequest = request.json()?;
    let session_id = state.sessions.create_session(&req.username)?;
    let user = state
        .sessions
        .get_user(&session_id)
        .ok_or_else(|| ChatError::Internal("Failed to create session".to_string()))?;

    info!("User {} logged in", user.username);
    Ok(HttpResponse::json(
        200,
        &LoginResponse {
            session_id,
            message: format!("Welcome {}! Your session has been created.", user.username),
            username: user.username,
        },
    ))
}

fn logout(state: &AppState, request: &HttpRequest) -> Result<HttpResponse> {
    let session_id = required_session_id(request)?;
    if !state.sessions.delete_session(session_id) {
        return Err(ChatError::SessionNotFound);
    }
    info!("Session {} ended", session_id);
    Ok(HttpResponse::json(
        200,
        &serde_json::json!({ "message": "Session ended successfully" }),
    ))
}

async fn chat(state: Arc<AppState>, request: &HttpRequest) -> Result<HttpResponse> {
    let req: ChatRequest = request.json()?;
    if req.message.is_empty() {
        return Err(ChatError::InvalidRequest("message must not be empty".to_string()));
    }
    let assistant = session_assistant(&state, &req.session_id)?;

    let outcome = blocking(move || {
        let mut assistant = lock_assistant(&assistant)?;
        Ok(assistant.handle_chat(&req.message))
    })
    .await?;
    Ok(HttpResponse::json(200, &ChatResponse::from(outcome)))
}

async fn database_schema(state: Arc<AppState>, request: &HttpRequest) -> Result<HttpResponse> {
    let assistant = session_assistant(&state, required_session_id(request)?)?;
    let schema = blocking(move || {
        let assistant = lock_assistant(&assistant)?;
        assistant.database_schema()
    })
    .await?;
    Ok(HttpResponse::json(200, &schema))
}

async fn database_info(state: Arc<AppState>, request: &HttpRequest) -> Result<HttpResponse> {
    let assistant = session_assistant(&state, required_session_id(request)?)?;
    let info = blocking(move || {
        let assistant = lock_assistant(&assistant)?;
        assistant.database_info()
    })
    .await?;
    Ok(HttpResponse::json(200, &info))
}

async fn upload(state: Arc<AppState>, request: &HttpRequest) -> Result<HttpResponse> {
    let storage = session_storage(&state, required_session_id(request)?)?;

    let content_type = request.header("content-type").unwrap_or_default();
    let (filename, content) = if content_type.starts_with("multipart/form-data") {
        multipart_file(&request.body, content_type)
            .ok_or_else(|| ChatError::InvalidRequest("No file part in upload".to_string()))?
    } else {
        let filename = request
            .query_param("filename")
            .ok_or_else(|| ChatError::InvalidRequest("filename is required".to_string()))?;
        (filename.to_string(), request.body.clone())
    };

    if !filename.ends_with(".csv") {
        return Err(ChatError::InvalidRequest("Only CSV files are supported".to_string()));
    }

    let tables_created = blocking(move || upload_csv_bytes(&storage, &content, &filename)).await?;
    Ok(HttpResponse::json(
        200,
        &UploadResponse {
            success: true,
            message: format!(
                "Successfully uploaded data and created tables: {}",
                tables_created.join(", ")
            ),
            tables_created,
        },
    ))
}

async fn sample_data(state: Arc<AppState>, request: &HttpRequest) -> Result<HttpResponse> {
    let storage = session_storage(&state, required_session_id(request)?)?;
    let tables_created = blocking(move || create_sample_data(&storage)).await?;
    Ok(HttpResponse::json(
        200,
        &UploadResponse {
            success: true,
            message: format!(
                "Successfully created sample data with tables: {}",
                tables_created.join(", ")
            ),
            tables_created,
        },
    ))
}

fn required_session_id(request: &HttpRequest) -> Result<&str> {
    request
        .query_param("session_id")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ChatError::InvalidRequest("session_id is required".to_string()))
}

fn session_assistant(state: &AppState, session_id: &str) -> Result<SharedAssistant> {
    state.sessions.assistant(session_id).ok_or(ChatError::Unauthorized)
}

fn session_storage(state: &AppState, session_id: &str) -> Result<SqliteStorage> {
    state.sessions.storage(session_id).ok_or(ChatError::Unauthorized)
}

/// Run SQLite work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChatError::Internal(format!("worker task failed: {}", e)))?
}
