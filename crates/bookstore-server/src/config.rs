use std::{path::PathBuf, time::Duration};

use crate::error::Result;
use bookstore_types::config::BackendConfig;
pub use clap::Parser;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "BOOKSTORE_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "BOOKSTORE_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        env = "BOOKSTORE_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Default token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(long, env = "BOOKSTORE_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.backend.data_dir()
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = ServerConfig::try_parse_from([
            "bookstore-server",
            "--data-dir",
            "/tmp/bookstore-test",
            "--port",
            "3456",
            "--token-validity",
            "2h 30m",
        ])
        .unwrap();
        assert_eq!(config.port, 3456);
        assert_eq!(config.listen_address, "127.0.0.1");
        assert_eq!(config.token_validity, Duration::from_secs(9000));
        assert!(!config.cors);
        assert_eq!(
            config.database_url(),
            "sqlite:///tmp/bookstore-test/bookstore.db"
        );
    }
}
