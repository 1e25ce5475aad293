use anyhow::Result;
use clap::Parser;
use sqlchat::agent::SqlAssistant;
use sqlchat::db::{create_sample_data, upload_csv_file, SqliteStorage};
use sqlchat::models::ChatOutcome;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sqlchat")]
#[command(about = "Ask a question about a SQLite database in plain language")]
struct Args {
    /// The question in natural language
    question: String,

    /// Path to the database file (created if missing)
    #[arg(short, long, default_value = "sqlchat.db")]
    database: PathBuf,

    /// Load the customers/orders sample tables first
    #[arg(long)]
    sample_data: bool,

    /// CSV files to load before asking (table named after the file)
    #[arg(short, long)]
    load: Vec<PathBuf>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let storage = SqliteStorage::open(&args.database)?;

    if args.sample_data {
        let tables = create_sample_data(&storage)?;
        info!("Loaded sample tables: {}", tables.join(", "));
    }
    for csv in &args.load {
        let tables = upload_csv_file(&storage, csv, None)?;
        info!("Loaded {} from {}", tables.join(", "), csv.display());
    }

    let mut assistant = SqlAssistant::new(storage);
    match assistant.handle_chat(&args.question) {
        ChatOutcome::Success { response_text, sql, row_count, .. } => {
            println!("{}", response_text);
            println!("\n-- {} ({} rows)", sql, row_count);
        }
        ChatOutcome::Failure { response_text, .. } => {
            println!("{}", response_text);
            std::process::exit(1);
        }
    }

    Ok(())
}
