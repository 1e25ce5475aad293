//! Schema Inspector - table and column metadata from the SQLite catalog.

use super::Storage;
use crate::error::Result;
use crate::models::{ColumnDescriptor, DatabaseSchema};
use std::collections::HashMap;

pub struct SchemaInspector<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> SchemaInspector<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    /// User-created tables; `sqlite_*` internals are excluded.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.storage.list_table_names()
    }

    /// Column metadata for `table`. A missing table is not an error, it
    /// simply has no columns.
    pub fn describe_table(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.storage.describe_columns(table)
    }

    pub fn database_schema(&self) -> Result<DatabaseSchema> {
        let tables = self.list_tables()?;
        let mut table_schemas = HashMap::with_capacity(tables.len());
        for table in &tables {
            table_schemas.insert(table.clone(), self.describe_table(table)?);
        }
        Ok(DatabaseSchema { tables, table_schemas })
    }
}
