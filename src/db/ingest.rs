//! CSV ingestion - turns an uploaded CSV file into a table.
//!
//! The table name comes from the file stem unless given explicitly, and is
//! reduced to letters, digits and underscores. Column types are inferred from the cells:
//! all-integer columns become INTEGER, all-numeric columns REAL, everything
//! else TEXT. Empty cells load as NULL. An existing table of the same name is
//! replaced.

use super::sqlite::{ColumnKind, SqliteStorage};
use crate::error::{ChatError, Result};
use rusqlite::types::Value as SqlValue;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Keep only alphanumerics (any script) and underscores.
pub fn sanitize_table_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Load a CSV file from disk. Returns the names of the tables created.
pub fn upload_csv_file(
    storage: &SqliteStorage,
    csv_path: impl AsRef<Path>,
    table_name: Option<&str>,
) -> Result<Vec<String>> {
    let csv_path = csv_path.as_ref();
    let raw_name = match table_name {
        Some(name) => name.to_string(),
        None => file_stem(csv_path)?,
    };
    let file = std::fs::File::open(csv_path).map_err(|e| ChatError::Ingest(e.to_string()))?;
    load_csv(storage, file, &raw_name)
}

/// Load CSV content received over the wire, naming the table after `file_name`.
pub fn upload_csv_bytes(storage: &SqliteStorage, bytes: &[u8], file_name: &str) -> Result<Vec<String>> {
    let raw_name = file_stem(Path::new(file_name))?;
    load_csv(storage, bytes, &raw_name)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ChatError::Ingest(format!("Cannot derive a table name from {}", path.display())))
}

fn load_csv<R: Read>(storage: &SqliteStorage, reader: R, raw_name: &str) -> Result<Vec<String>> {
    let table = sanitize_table_name(raw_name);
    if table.is_empty() {
        return Err(ChatError::Ingest(format!("'{}' is not a usable table name", raw_name)));
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let headers = dedupe_headers(headers);

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        records.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|idx| infer_kind(records.iter().map(|r| r[idx].as_str())))
        .collect();

    let rows: Vec<Vec<SqlValue>> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&kinds)
                .map(|(cell, kind)| convert_cell(cell, *kind))
                .collect()
        })
        .collect();

    let columns: Vec<(String, ColumnKind)> = headers.into_iter().zip(kinds).collect();
    storage
        .replace_table(&table, &columns, &rows)
        .map_err(|e| ChatError::Ingest(format!("Error creating table {}: {}", table, e)))?;

    info!("Uploaded CSV into table {} ({} rows)", table, rows.len());
    Ok(vec![table])
}

/// Blank headers get positional names; repeated headers get a numeric suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                header
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut saw_value = false;
    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        saw_value = true;
        if kind == ColumnKind::Integer && cell.parse::<i64>().is_err() {
            kind = ColumnKind::Real;
        }
        if kind == ColumnKind::Real && cell.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
    }
    if saw_value {
        kind
    } else {
        ColumnKind::Text
    }
}

fn convert_cell(cell: &str, kind: ColumnKind) -> SqlValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return SqlValue::Null;
    }
    match kind {
        ColumnKind::Integer => trimmed.parse().map(SqlValue::Integer).unwrap_or(SqlValue::Null),
        ColumnKind::Real => trimmed.parse().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        ColumnKind::Text => SqlValue::Text(cell.to_string()),
    }
}

/// Create the `customers` and `orders` demonstration tables.
pub fn create_sample_data(storage: &SqliteStorage) -> Result<Vec<String>> {
    let customers = [
        (1, "Alice Johnson", "alice@email.com", "New York"),
        (2, "Bob Smith", "bob@email.com", "Los Angeles"),
        (3, "Carol Davis", "carol@email.com", "Chicago"),
        (4, "David Wilson", "david@email.com", "Houston"),
        (5, "Eve Brown", "eve@email.com", "Phoenix"),
    ];
    let customer_rows: Vec<Vec<SqlValue>> = customers
        .iter()
        .map(|(id, name, email, city)| {
            vec![
                SqlValue::Integer(*id),
                SqlValue::Text(name.to_string()),
                SqlValue::Text(email.to_string()),
                SqlValue::Text(city.to_string()),
            ]
        })
        .collect();
    storage.replace_table(
        "customers",
        &[
            ("customer_id".to_string(), ColumnKind::Integer),
            ("name".to_string(), ColumnKind::Text),
            ("email".to_string(), ColumnKind::Text),
            ("city".to_string(), ColumnKind::Text),
        ],
        &customer_rows,
    )?;

    let orders = [
        (101, 1, "Laptop", 1, 999.99, "2024-01-15"),
        (102, 2, "Mouse", 2, 29.99, "2024-01-16"),
        (103, 1, "Keyboard", 1, 79.99, "2024-01-17"),
        (104, 3, "Monitor", 1, 299.99, "2024-01-18"),
        (105, 4, "Headphones", 1, 149.99, "2024-01-19"),
        (106, 2, "Webcam", 1, 89.99, "2024-01-20"),
        (107, 5, "Tablet", 1, 399.99, "2024-01-21"),
        (108, 3, "Printer", 1, 199.99, "2024-01-22"),
    ];
    let order_rows: Vec<Vec<SqlValue>> = orders
        .iter()
        .map(|(order_id, customer_id, product, quantity, price, date)| {
            vec![
                SqlValue::Integer(*order_id),
                SqlValue::Integer(*customer_id),
                SqlValue::Text(product.to_string()),
                SqlValue::Integer(*quantity),
                SqlValue::Real(*price),
                SqlValue::Text(date.to_string()),
            ]
        })
        .collect();
    storage.replace_table(
        "orders",
        &[
            ("order_id".to_string(), ColumnKind::Integer),
            ("customer_id".to_string(), ColumnKind::Integer),
            ("product".to_string(), ColumnKind::Text),
            ("quantity".to_string(), ColumnKind::Integer),
            ("price".to_string(), ColumnKind::Real),
            ("order_date".to_string(), ColumnKind::Text),
        ],
        &order_rows,
    )?;

    Ok(vec!["customers".to_string(), "orders".to_string()])
}
