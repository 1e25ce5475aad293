//! SQLite-backed storage, one database file per user.
//!
//! Connections are opened per operation; the handle itself only carries the path.

use super::{quote_identifier, Storage};
use crate::error::{ChatError, Result};
use crate::models::{ColumnDescriptor, Row};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Declared SQLite type of an ingested column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    path: PathBuf,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            let conn = Connection::open(&path)?;
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            info!("Created database file {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .map_err(|e| ChatError::Storage(format!("Failed to open database: {}", e)))
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Drop and recreate `table` with the given columns, then load `rows`
    /// in one transaction.
    pub fn replace_table(
        &self,
        table: &str,
        columns: &[(String, ColumnKind)],
        rows: &[Vec<SqlValue>],
    ) -> Result<usize> {
        if columns.is_empty() {
            return Err(ChatError::Ingest(format!("Table {} has no columns", table)));
        }

        let quoted = quote_identifier(table);
        let column_defs = columns
            .iter()
            .map(|(name, kind)| format!("{} {}", quote_identifier(name), kind.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", quoted, column_defs), [])?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES ({})", quoted, placeholders))?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!("Loaded {} rows into table {}", rows.len(), table);
        Ok(rows.len())
    }
}

impl Storage for SqliteStorage {
    fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("Executing: {}", sql);
        let conn = self.connect()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(idx)?));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn list_table_names(&self) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| {
                let notnull: i64 = row.get("notnull")?;
                let pk: i64 = row.get("pk")?;
                Ok(ColumnDescriptor {
                    column: row.get("name")?,
                    data_type: row.get("type")?,
                    nullable: notnull == 0,
                    primary_key: pk != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> SqliteStorage {
        SqliteStorage::open(dir.path().join("nested").join("user.db")).unwrap()
    }

    #[test]
    fn test_open_creates_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        assert!(store.path().exists());
        assert!(store.list_table_names().unwrap().is_empty());
    }

    #[test]
    fn test_run_query_preserves_column_order() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        let rows = store.run_query("SELECT 2 AS zeta, 'a' AS alpha, NULL AS mid, 1.5 AS r").unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "r"]);
        assert_eq!(rows[0]["zeta"], json!(2));
        assert_eq!(rows[0]["mid"], Value::Null);
        assert_eq!(rows[0]["r"], json!(1.5));
    }

    #[test]
    fn test_replace_table_and_describe() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        let columns = vec![
            ("id".to_string(), ColumnKind::Integer),
            ("name".to_string(), ColumnKind::Text),
        ];
        let rows = vec![
            vec![SqlValue::Integer(1), SqlValue::Text("a".into())],
            vec![SqlValue::Integer(2), SqlValue::Null],
        ];
        store.replace_table("people", &columns, &rows).unwrap();
        // Replacing again must not duplicate rows.
        store.replace_table("people", &columns, &rows).unwrap();

        assert_eq!(store.list_table_names().unwrap(), vec!["people"]);
        assert_eq!(store.count_rows("people").unwrap(), 2);

        let described = store.describe_columns("people").unwrap();
        assert_eq!(described.len(), 2);
        assert_eq!(described[0].column, "id");
        assert_eq!(described[0].data_type, "INTEGER");
        assert!(described[1].nullable);
        assert!(!described[1].primary_key);
    }

    #[test]
    fn test_describe_unknown_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        assert!(store.describe_columns("missing").unwrap().is_empty());
    }

    #[test]
    fn test_bad_sql_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = storage(&dir);
        let err = store.run_query("SELECT * FROM nope").unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
    }
}
