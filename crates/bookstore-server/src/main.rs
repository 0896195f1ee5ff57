use bookstore_server::{config::ServerConfig, run, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerConfig::load()?;
    info!(
        "Starting bookstore server on {}:{}",
        args.listen_address, args.port
    );
    run(args).await
}
