//! Multi-user natural-language chat over private SQLite databases.
//!
//! Each user session owns one database file and one [`agent::SqlAssistant`].
//! A question is resolved to a fixed SQL template, run through a keyword
//! guard, and the rows are rendered back as text.

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod server;
pub mod session;

pub use agent::SqlAssistant;
pub use config::ServerConfig;
pub use error::{ChatError, Result};
pub use session::SessionManager;
