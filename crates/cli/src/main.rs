//! Summit CLI - Database management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations to the configured database
//! summit-cli migrate
//!
//! # Apply them to a specific database
//! summit-cli migrate --database-url sqlite://registrations.db
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "summit-cli")]
#[command(author, version, about = "Summit registration CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Database URL (defaults to `SUMMIT_DATABASE_URL`, then `DATABASE_URL`)
        #[arg(long)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { database_url } => {
            commands::migrate::run(database_url).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate_with_url() {
        let cli = Cli::try_parse_from(["summit-cli", "migrate", "--database-url", "sqlite::memory:"])
            .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Migrate { database_url } = cli.command;
        assert_eq!(database_url.as_deref(), Some("sqlite::memory:"));
    }
}
