//! Guarded Executor
//!
//! Runs read statements against a user's database. Anything whose upper-cased
//! text contains a mutating keyword is refused before storage is touched. The
//! check is a plain substring test, so identifiers such as `update_flag` are
//! refused as well.

use super::resolver::NO_TABLES_SQL;
use crate::db::Storage;
use crate::error::{ChatError, Result};
use crate::models::QueryResult;
use tracing::{debug, warn};

pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

/// The first forbidden keyword found in `sql`, in denylist order.
pub fn forbidden_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    FORBIDDEN_KEYWORDS.iter().copied().find(|kw| upper.contains(kw))
}

pub struct GuardedExecutor<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> GuardedExecutor<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(ChatError::EmptyQuery);
        }

        if let Some(keyword) = forbidden_keyword(sql) {
            warn!("Rejected statement containing {}: {}", keyword, sql);
            return Err(ChatError::ForbiddenOperation {
                keyword: keyword.to_string(),
            });
        }

        if sql == NO_TABLES_SQL {
            debug!("No tables available, skipping storage");
            return Ok(QueryResult::empty());
        }

        let rows = self
            .storage
            .run_query(sql)
            .map_err(|e| ChatError::QueryExecution(e.to_string()))?;
        Ok(QueryResult::new(rows))
    }
}
