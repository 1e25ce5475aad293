//! Chat service - one assistant per session.
//!
//! A chat turn always runs in the same order: read the table catalog, resolve
//! the question to SQL, execute it through the guard, render the rows, then
//! phrase the answer. Failures anywhere in that chain come back as a
//! [`ChatOutcome::Failure`], never as an `Err`.

use super::executor::GuardedExecutor;
use super::renderer::render;
use super::resolver::resolve;
use crate::db::{quote_identifier, SchemaInspector, SqliteStorage, Storage};
use crate::error::Result;
use crate::models::{ChatMessage, ChatOutcome, DatabaseInfo, DatabaseSchema, Role, TableInfo};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const PREVIEW_ROWS: usize = 3;

pub struct SqlAssistant<S: Storage = SqliteStorage> {
    storage: S,
    history: Vec<ChatMessage>,
}

impl<S: Storage> SqlAssistant<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            history: Vec::new(),
        }
    }

    /// Messages exchanged so far. Recorded only; never consulted when answering.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn handle_chat(&mut self, utterance: &str) -> ChatOutcome {
        self.history.push(ChatMessage::new(Role::User, utterance));
        let outcome = answer(&self.storage, utterance);
        self.history
            .push(ChatMessage::new(Role::Assistant, outcome.response_text()));
        outcome
    }

    pub fn database_schema(&self) -> Result<DatabaseSchema> {
        SchemaInspector::new(&self.storage).database_schema()
    }

    pub fn database_info(&self) -> Result<DatabaseInfo> {
        database_info(&self.storage)
    }
}

/// Answer one question against `storage`.
pub fn answer<S: Storage + ?Sized>(storage: &S, utterance: &str) -> ChatOutcome {
    match try_answer(storage, utterance) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Chat turn failed: {}", e);
            ChatOutcome::Failure {
                response_text: format!("I encountered an unexpected error: {}", e),
                error: e.to_string(),
            }
        }
    }
}

fn try_answer<S: Storage + ?Sized>(storage: &S, utterance: &str) -> Result<ChatOutcome> {
    let tables = SchemaInspector::new(storage).list_tables()?;
    let sql = resolve(utterance, &tables);
    debug!("Resolved '{}' to: {}", utterance, sql);

    let result = match GuardedExecutor::new(storage).execute(&sql) {
        Ok(result) => result,
        Err(e) => {
            return Ok(ChatOutcome::Failure {
                response_text: format!("I encountered an error: {}", e),
                error: e.to_string(),
            })
        }
    };

    let rendered = render(&result.rows);
    let response_text = if utterance.to_lowercase().contains("tables") {
        format!("Here are the available tables in your database:\n{}", rendered)
    } else if result.row_count == 0 {
        "I found no results for your query.".to_string()
    } else {
        format!(
            "Based on your question '{}', here's what I found:\n\n{}",
            utterance, rendered
        )
    };

    Ok(ChatOutcome::Success {
        response_text,
        sql,
        rows: result.rows,
        row_count: result.row_count,
    })
}

/// Tables with their columns, row count and a short preview.
pub fn database_info<S: Storage + ?Sized>(storage: &S) -> Result<DatabaseInfo> {
    let inspector = SchemaInspector::new(storage);
    let tables = inspector.list_tables()?;
    let mut table_info = HashMap::with_capacity(tables.len());

    for table in &tables {
        let quoted = quote_identifier(table);
        let columns = inspector
            .describe_table(table)?
            .into_iter()
            .map(|c| c.column)
            .collect();
        let sample_data = storage.table_preview(table, PREVIEW_ROWS)?;
        let row_count = storage
            .run_query(&format!("SELECT COUNT(*) as count FROM {}", quoted))?
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);

        table_info.insert(
            table.clone(),
            TableInfo {
                columns,
                row_count,
                sample_data,
            },
        );
    }

    info!("Collected database info for {} tables", tables.len());
    Ok(DatabaseInfo { tables, table_info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::resolver::NO_TABLES_SQL;
    use crate::db::create_sample_data;
    use crate::error::ChatError;
    use crate::models::{ColumnDescriptor, Row};
    use tempfile::TempDir;

    fn sample_assistant(dir: &TempDir) -> SqlAssistant {
        let storage = SqliteStorage::open(dir.path().join("u.db")).unwrap();
        create_sample_data(&storage).unwrap();
        SqlAssistant::new(storage)
    }

    #[test]
    fn test_count_customers() {
        let dir = TempDir::new().unwrap();
        let mut assistant = sample_assistant(&dir);
        let outcome = assistant.handle_chat("How many customers do I have?");
        match outcome {
            ChatOutcome::Success { response_text, sql, row_count, .. } => {
                assert_eq!(sql, "SELECT COUNT(*) as customer_count FROM customers");
                assert_eq!(row_count, 1);
                assert_eq!(
                    response_text,
                    "Based on your question 'How many customers do I have?', here's what I found:\n\nResult: 5"
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(assistant.history().len(), 2);
        assert_eq!(assistant.history()[0].role, Role::User);
    }

    #[test]
    fn test_tables_phrasing() {
        let dir = TempDir::new().unwrap();
        let mut assistant = sample_assistant(&dir);
        let outcome = assistant.handle_chat("What tables are there?");
        assert_eq!(
            outcome.response_text(),
            "Here are the available tables in your database:\nname\n----\ncustomers\norders"
        );
    }

    #[test]
    fn test_no_tables_yields_no_results() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("empty.db")).unwrap();
        let mut assistant = SqlAssistant::new(storage);
        let outcome = assistant.handle_chat("show me something");
        assert_eq!(outcome.sql(), Some(NO_TABLES_SQL));
        assert_eq!(outcome.response_text(), "I found no results for your query.");
        assert!(outcome.error().is_none());
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut assistant = sample_assistant(&dir);
        let first = assistant.handle_chat("latest orders");
        let second = assistant.handle_chat("latest orders");
        assert_eq!(first, second);
    }

    #[test]
    fn test_execution_failure_is_reported_as_error() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("u.db")).unwrap();
        crate::db::upload_csv_bytes(&storage, b"id,product\n1,Pen\n", "orders.csv").unwrap();
        let mut assistant = SqlAssistant::new(storage);

        let outcome = assistant.handle_chat("total orders");
        assert!(outcome.sql().is_none());
        let error = outcome.error().unwrap();
        assert!(error.starts_with("Query execution error: Database error: "), "{}", error);
        assert!(error.contains("no such column"), "{}", error);
        assert_eq!(outcome.response_text(), format!("I encountered an error: {}", error));
    }

    #[test]
    fn test_guard_rejection_of_fallback_table() {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::open(dir.path().join("u.db")).unwrap();
        crate::db::upload_csv_bytes(&storage, b"id\n1\n", "update_log.csv").unwrap();
        let mut assistant = SqlAssistant::new(storage);

        let outcome = assistant.handle_chat("anything");
        assert_eq!(
            outcome,
            ChatOutcome::Failure {
                response_text: "I encountered an error: Operation 'UPDATE' is not allowed for security reasons."
                    .to_string(),
                error: "Operation 'UPDATE' is not allowed for security reasons.".to_string(),
            }
        );
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn run_query(&self, _sql: &str) -> Result<Vec<Row>> {
            Err(ChatError::Storage("disk I/O error".to_string()))
        }

        fn list_table_names(&self) -> Result<Vec<String>> {
            Err(ChatError::Storage("disk I/O error".to_string()))
        }

        fn describe_columns(&self, _table: &str) -> Result<Vec<ColumnDescriptor>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_catalog_failure_is_unexpected_error() {
        let mut assistant = SqlAssistant::new(BrokenStorage);
        let outcome = assistant.handle_chat("how many customers");
        assert_eq!(
            outcome.response_text(),
            "I encountered an unexpected error: Database error: disk I/O error"
        );
        assert_eq!(outcome.error(), Some("Database error: disk I/O error"));
        assert!(outcome.sql().is_none());
    }

    #[test]
    fn test_database_info() {
        let dir = TempDir::new().unwrap();
        let assistant = sample_assistant(&dir);
        let info = assistant.database_info().unwrap();
        assert_eq!(info.tables, vec!["customers", "orders"]);
        let orders = &info.table_info["orders"];
        assert_eq!(orders.row_count, 8);
        assert_eq!(orders.sample_data.len(), 3);
        assert_eq!(orders.columns[0], "order_id");
    }
}
