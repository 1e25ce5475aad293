//! HTTP server for the chat API
//! Simple HTTP server using tokio and basic HTTP handling

pub mod http;
pub mod routes;

pub use self::http::{HttpRequest, HttpResponse};
pub use routes::handle_request;

use crate::config::ServerConfig;
use crate::session::SessionManager;
use self::http::{content_length, find_subslice};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Everything a request handler may touch.
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let sessions = SessionManager::new(&config.data_dir, config.session_timeout());
        Self { config, sessions }
    }
}

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)?;
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Server listening on {}", config.bind_address());
    serve(listener, Arc::new(AppState::new(config))).await
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&state)));
    }
}

enum ReadOutcome {
    Complete(Vec<u8>),
    TooLarge,
    Closed,
}

async fn handle_connection(mut stream: TcpStream, state: Arc<AppState>) {
    let limit = state.config.max_request_bytes;
    let read = timeout(
        Duration::from_secs(state.config.read_timeout_secs),
        read_request(&mut stream, limit),
    )
    .await;

    let response = match read {
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
        Ok(Err(e)) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
        Ok(Ok(ReadOutcome::Closed)) => return,
        Ok(Ok(ReadOutcome::TooLarge)) => HttpResponse::json(
            413,
            &serde_json::json!({ "error": format!("Request exceeds {} bytes", limit) }),
        ),
        Ok(Ok(ReadOutcome::Complete(raw))) => match HttpRequest::parse(&raw) {
            Ok(request) => handle_request(state, request).await,
            Err(e) => routes::error_response(&e),
        },
    };

    if let Err(e) = stream.write_all(&response.to_bytes()).await {
        warn!("Failed to write response: {}", e);
    }
    let _ = stream.shutdown().await;
}

/// Read until the head and `Content-Length` body bytes have arrived.
async fn read_request(stream: &mut TcpStream, limit: usize) -> std::io::Result<ReadOutcome> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if buffer.len() > limit {
            return Ok(ReadOutcome::TooLarge);
        }

        if let Some(head_end) = find_subslice(&buffer, b"\r\n\r\n") {
            let expected = head_end + 4 + content_length(&buffer[..head_end]).unwrap_or(0);
            if expected > limit {
                return Ok(ReadOutcome::TooLarge);
            }
            if buffer.len() >= expected {
                break;
            }
        }
    }

    if buffer.is_empty() {
        Ok(ReadOutcome::Closed)
    } else {
        Ok(ReadOutcome::Complete(buffer))
    }
}
