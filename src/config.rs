//! Server configuration: command-line flags with environment fallbacks.
//! A `.env` file is loaded by the binary before parsing.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "sqlchat-server")]
#[command(about = "Multi-user natural-language chat over private SQLite databases")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "SQLCHAT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SQLCHAT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory holding one database file per session
    #[arg(short, long, env = "SQLCHAT_DATA_DIR", default_value = "user_databases")]
    pub data_dir: PathBuf,

    /// Hours before a session expires
    #[arg(long, env = "SQLCHAT_SESSION_TIMEOUT_HOURS", default_value_t = 24)]
    pub session_timeout_hours: i64,

    /// Largest request (headers + body) accepted, in bytes
    #[arg(long, env = "SQLCHAT_MAX_REQUEST_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_request_bytes: usize,

    /// Seconds to wait for a complete request
    #[arg(long, env = "SQLCHAT_READ_TIMEOUT_SECS", default_value_t = 5)]
    pub read_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_timeout_hours)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("user_databases"),
            session_timeout_hours: 24,
            max_request_bytes: 10 * 1024 * 1024,
            read_timeout_secs: 5,
        }
    }
}
