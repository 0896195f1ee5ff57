use anyhow::bail;
use bookstore_types::config::BackendConfig;
use clap::Parser;

use crate::commands::{create_user_repository, Executor};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Parser, Debug)]
pub struct ChangePasswordCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name")]
    pub username: String,
    #[arg(short, long, help = "New user password")]
    pub password: String,
}

impl Executor for ChangePasswordCmd {
    async fn run(self) -> anyhow::Result<()> {
        if self.password.len() < MIN_PASSWORD_LEN {
            bail!("Password must have at least {MIN_PASSWORD_LEN} characters");
        }
        let repository = create_user_repository(&self.backend.database_url()).await?;
        let user = repository.find_by_username(&self.username).await?;
        repository.set_password(user.id, &self.password).await?;
        Ok(())
    }
}
