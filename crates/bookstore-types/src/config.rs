use clap::Parser;
use std::{fs, path::PathBuf};

/// Backend location options, shared by server and CLI
#[derive(Debug, Clone, Parser)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "BOOKSTORE_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db or similar, default is sqlite://[data-dir]/bookstore.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "BOOKSTORE_DATA_DIR",
        help = "Data directory (database, secret etc.), default is system default like ~/.local/share/bookstore",
        default_value_t = default_data_dir()
    )]
    data_dir: String,
}

pub fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("bookstore"))
        .unwrap_or_else(|| PathBuf::from("bookstore"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/bookstore.db", self.data_dir))
    }
}
