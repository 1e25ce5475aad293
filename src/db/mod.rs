//! Database module for the per-user SQLite files
//!
//! This module provides the storage capability the assistant runs against,
//! catalog inspection, and CSV ingestion.

pub mod ingest;
pub mod schema;
pub mod sqlite;

pub use ingest::{create_sample_data, sanitize_table_name, upload_csv_bytes, upload_csv_file};
pub use schema::SchemaInspector;
pub use sqlite::SqliteStorage;

use crate::error::Result;
use crate::models::{ColumnDescriptor, Row};

/// Read access to one user's database.
pub trait Storage {
    /// Run a statement and collect every row it returns.
    fn run_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// User-created table names, in catalog order.
    fn list_table_names(&self) -> Result<Vec<String>>;

    /// Column metadata for one table. Unknown tables yield an empty list.
    fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// First `limit` rows of a table.
    fn table_preview(&self, table: &str, limit: usize) -> Result<Vec<Row>> {
        self.run_query(&format!("SELECT * FROM {} LIMIT {}", quote_identifier(table), limit))
    }
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
