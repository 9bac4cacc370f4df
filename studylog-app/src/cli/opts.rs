use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "studylog", version, about = "studylog review engine API server")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value = "sqlite")]
    pub store: StoreKind,

    /// SQLite DB path when --store sqlite
    #[arg(long, default_value = "studylog.sqlite3")]
    pub db_path: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Launch the HTTP API
    Serve(ServeCmd),
    /// Seed a card for a user (stand-in for card management; test/demo use)
    SeedCard(SeedCardCmd),
}

#[derive(Debug, Args, Clone)]
pub struct ServeCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}

#[derive(Debug, Args, Clone)]
pub struct SeedCardCmd {
    /// Owning user id
    #[arg(long)]
    pub user_id: String,
}
