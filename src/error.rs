use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Operation '{keyword}' is not allowed for security reasons.")]
    ForbiddenOperation { keyword: String },

    #[error("Database error: {0}")]
    Storage(String),

    #[error("Query execution error: {0}")]
    QueryExecution(String),

    #[error("Error uploading CSV data: {0}")]
    Ingest(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid or expired session")]
    Unauthorized,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error uploading CSV data: {0}")]
    Csv(#[from] csv::Error),
}

impl ChatError {
    /// HTTP status the server answers with when this error escapes a handler.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::InvalidRequest(_) | ChatError::Ingest(_) | ChatError::Csv(_) => 400,
            ChatError::Json(_) => 400,
            ChatError::Unauthorized => 401,
            ChatError::SessionNotFound => 404,
            _ => 500,
        }
    }
}

impl From<rusqlite::Error> for ChatError {
    fn from(e: rusqlite::Error) -> Self {
        ChatError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
