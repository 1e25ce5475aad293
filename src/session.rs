//! Session Management
//!
//! Maps opaque session ids to a user and that user's assistant. The manager is
//! owned by the server state and handed to request handlers; each session owns
//! exactly one assistant, dropped with the session on logout or expiry.
//! Database files outlive their sessions.

use crate::agent::SqlAssistant;
use crate::db::SqliteStorage;
use crate::error::{ChatError, Result};
use crate::models::User;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

pub const MAX_USERNAME_LEN: usize = 50;

pub type SharedAssistant = Arc<Mutex<SqlAssistant>>;

struct Session {
    user: User,
    storage: SqliteStorage,
    assistant: SharedAssistant,
}

pub struct SessionManager {
    sessions: DashMap<String, Session>,
    data_dir: PathBuf,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(data_dir: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            data_dir: data_dir.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Start a session for `username` and provision its database file.
    pub fn create_session(&self, username: &str) -> Result<String> {
        let len = username.chars().count();
        if len == 0 || len > MAX_USERNAME_LEN {
            return Err(ChatError::InvalidRequest(format!(
                "username must be between 1 and {} characters",
                MAX_USERNAME_LEN
            )));
        }

        self.cleanup_expired_sessions();

        let session_id = Uuid::new_v4().to_string();
        let database_path = self.database_path_for(username, &session_id);
        let storage = SqliteStorage::open(&database_path)?;

        let user = User {
            username: username.to_string(),
            session_id: session_id.clone(),
            created_at: Utc::now(),
            database_path,
        };
        info!("Created session for {} -> {}", username, user.database_path.display());

        self.sessions.insert(
            session_id.clone(),
            Session {
                user,
                storage: storage.clone(),
                assistant: Arc::new(Mutex::new(SqlAssistant::new(storage))),
            },
        );
        Ok(session_id)
    }

    fn database_path_for(&self, username: &str, session_id: &str) -> PathBuf {
        let safe_username: String = username
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let short_id: String = session_id.chars().take(8).collect();
        self.data_dir.join(format!("{}_{}.db", safe_username, short_id))
    }

    fn is_expired(&self, user: &User) -> bool {
        Utc::now() - user.created_at > self.timeout
    }

    /// The user behind `session_id`, or `None` if unknown or expired.
    pub fn get_user(&self, session_id: &str) -> Option<User> {
        self.live_session(session_id, |s| s.user.clone())
    }

    /// The assistant owned by `session_id`.
    pub fn assistant(&self, session_id: &str) -> Option<SharedAssistant> {
        self.live_session(session_id, |s| Arc::clone(&s.assistant))
    }

    /// The session's database handle, reachable without locking its assistant.
    pub fn storage(&self, session_id: &str) -> Option<SqliteStorage> {
        self.live_session(session_id, |s| s.storage.clone())
    }

    fn live_session<T>(&self, session_id: &str, f: impl FnOnce(&Session) -> T) -> Option<T> {
        {
            let session = self.sessions.get(session_id)?;
            if !self.is_expired(&session.user) {
                return Some(f(session.value()));
            }
        }
        info!("Session {} expired", session_id);
        self.delete_session(session_id);
        None
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn validate_session(&self, session_id: &str) -> bool {
        self.get_user(session_id).is_some()
    }

    pub fn cleanup_expired_sessions(&self) {
        let before = self.sessions.len();
        let timeout = self.timeout;
        let now = Utc::now();
        self.sessions.retain(|_, s| now - s.user.created_at <= timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("Removed {} expired sessions", removed);
        }
    }

    pub fn active_sessions_count(&self) -> usize {
        self.cleanup_expired_sessions();
        self.sessions.len()
    }
}

/// Lock an assistant, turning a poisoned lock into an error.
pub fn lock_assistant(assistant: &SharedAssistant) -> Result<MutexGuard<'_, SqlAssistant>> {
    assistant
        .lock()
        .map_err(|e| ChatError::Storage(format!("Failed to acquire assistant lock: {}", e)))
}
