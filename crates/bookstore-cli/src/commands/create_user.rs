use clap::Parser;
use bookstore_types::config::BackendConfig;
use garde::Validate as _;
use tracing::info;

use crate::commands::{create_user_repository, Executor};

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    pub backend: BackendConfig,
    #[arg(short, long, help = "User name, used for login")]
    pub username: String,
    #[arg(
        short,
        long,
        help = "User password, user without password cannot log in"
    )]
    pub password: Option<String>,
    #[arg(long, help = "User is staff - can modify any book and manage users")]
    pub staff: bool,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let new_user = bookstore_dal::user::CreateUser {
            username: self.username,
            password: self.password,
            is_staff: self.staff,
        };
        new_user.validate()?;
        let repository = create_user_repository(&self.backend.database_url()).await?;
        let user = repository.create(new_user).await?;
        info!("Created user {} with id {}", user.username, user.id);

        Ok(())
    }
}
