//! Database location resolution: CLI flag, then environment, then the
//! per-user data directory.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "tally", about = "Persisted tally counter")]
pub struct Cli {
    /// SQLite database URL, e.g. sqlite://./data/tally.db
    #[arg(long)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
}

pub fn load_settings(cli: &Cli) -> Settings {
    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("TALLY_DATABASE_URL").ok())
        .unwrap_or_else(default_database_url);
    Settings { database_url }
}

fn default_database_url() -> String {
    let db_path = resolve_data_dir().join("tally.db");
    format!(
        "sqlite://{}",
        db_path.to_string_lossy().replace('\\', "/")
    )
}

fn resolve_data_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        return home.join(".tally");
    }
    if let Some(local) = dirs::data_local_dir() {
        return local.join("tally");
    }
    PathBuf::from(".tally")
}
