use bookstore_types::config::BackendConfig;
use clap::Args;
use tracing::info;

use crate::commands::{open_database, Executor};

#[derive(Args, Debug)]
pub struct MigrateCmd {
    #[command(flatten)]
    backend: BackendConfig,
}

impl Executor for MigrateCmd {
    async fn run(self) -> anyhow::Result<()> {
        let url = self.backend.database_url();
        let pool = open_database(&url).await?;
        pool.close().await;
        info!("Database {url} is up to date");
        Ok(())
    }
}
