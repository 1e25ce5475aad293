pub mod executor;
pub mod renderer;
pub mod resolver;
pub mod service;

pub use executor::{forbidden_keyword, GuardedExecutor, FORBIDDEN_KEYWORDS};
pub use renderer::render;
pub use resolver::{resolve, LIST_TABLES_SQL, NO_TABLES_SQL};
pub use service::{answer, database_info, SqlAssistant};
