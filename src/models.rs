//! Data models shared by the assistant, the session layer and the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// One result row: column name -> value, in SELECT column order.
pub type Row = serde_json::Map<String, Value>;

/// Rows returned by a successful statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Column metadata as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: Vec<String>,
    pub table_schemas: HashMap<String, Vec<ColumnDescriptor>>,
}

/// Per-table summary used by the database info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub columns: Vec<String>,
    pub row_count: i64,
    pub sample_data: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub tables: Vec<String>,
    pub table_info: HashMap<String, TableInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A logged-in user bound to one session and one private database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub database_path: PathBuf,
}

/// Outcome of one chat turn. Exactly one branch is ever populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Success {
        response_text: String,
        sql: String,
        rows: Vec<Row>,
        row_count: usize,
    },
    Failure {
        response_text: String,
        error: String,
    },
}

impl ChatOutcome {
    pub fn response_text(&self) -> &str {
        match self {
            ChatOutcome::Success { response_text, .. } => response_text,
            ChatOutcome::Failure { response_text, .. } => response_text,
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            ChatOutcome::Success { sql, .. } => Some(sql),
            ChatOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ChatOutcome::Success { .. } => None,
            ChatOutcome::Failure { error, .. } => Some(error),
        }
    }
}

// ============================================================================
// HTTP payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub username: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub query_executed: Option<String>,
    pub results: Option<Vec<Row>>,
    pub error: Option<String>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        match outcome {
            ChatOutcome::Success { response_text, sql, rows, .. } => ChatResponse {
                response: response_text,
                query_executed: Some(sql),
                results: Some(rows),
                error: None,
            },
            ChatOutcome::Failure { response_text, error } => ChatResponse {
                response: response_text,
                query_executed: None,
                results: None,
                error: Some(error),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub tables_created: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
    pub active_agents: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_outcome_maps_to_error_only() {
        let outcome = ChatOutcome::Failure {
            response_text: "I encountered an error: Empty query".to_string(),
            error: "Empty query".to_string(),
        };
        let response = ChatResponse::from(outcome);
        assert_eq!(response.error.as_deref(), Some("Empty query"));
        assert!(response.query_executed.is_none());
        assert!(response.results.is_none());
    }

    #[test]
    fn test_column_descriptor_serializes_type_field() {
        let col = ColumnDescriptor {
            column: "id".to_string(),
            data_type: "INTEGER".to_string(),
            nullable: false,
            primary_key: true,
        };
        let value = serde_json::to_value(&col).unwrap();
        assert_eq!(value, json!({"column": "id", "type": "INTEGER", "nullable": false, "primary_key": true}));
    }
}
