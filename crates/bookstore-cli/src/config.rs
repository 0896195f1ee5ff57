use clap::{Parser, Subcommand};

use crate::commands::{
    change_password::ChangePasswordCmd, create_user::CreateUserCmd, migrate::MigrateCmd,
};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for bookstore - administration commands working directly with bookstore database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Creates new user, use --staff for administrator
    CreateUser(CreateUserCmd),
    /// Sets new password for existing user
    ChangePassword(ChangePasswordCmd),
    /// Creates database if needed and applies migrations
    Migrate(MigrateCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::ChangePassword(cmd) => cmd.run().await,
            Command::Migrate(cmd) => cmd.run().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_user() {
        let config = CliConfig::try_parse_from([
            "bookstore-cli",
            "create-user",
            "--data-dir",
            "/tmp/bookstore-cli-test",
            "--username",
            "admin",
            "--password",
            "admin-password",
            "--staff",
        ])
        .unwrap();
        match config.command {
            Command::CreateUser(cmd) => {
                assert_eq!(cmd.username, "admin");
                assert!(cmd.staff);
            }
            _ => panic!("Wrong command"),
        }
    }
}
