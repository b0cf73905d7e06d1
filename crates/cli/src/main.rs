//! WooCommerce back-office CLI - migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the back-office's own tables
//! wbo-cli migrate
//!
//! # Create an operator account
//! wbo-cli user create --username ana --email ana@example.com --password '...' --role admin
//!
//! # Check the HPOS orders counter against the highest post ID
//! wbo-cli sync-auto-increment --dry-run
//!
//! # Retry failed order e-mail triggers
//! wbo-cli outbox replay --limit 20
//! ```
//!
//! Connection settings come from the same environment as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wbo-cli")]
#[command(author, version, about = "WooCommerce back-office CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the embedded database migrations
    Migrate,
    /// Manage operator accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Raise the orders AUTO_INCREMENT past every used post ID
    SyncAutoIncrement {
        /// Print the decision without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Order e-mail outbox maintenance
    Outbox {
        #[command(subcommand)]
        action: OutboxAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an operator account
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Role (`master`, `admin`, `advisor`, `user`)
        #[arg(short, long, default_value = "user")]
        role: String,

        #[arg(short, long)]
        full_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum OutboxAction {
    /// Re-run failed e-mail triggers, oldest first
    Replay {
        #[arg(short, long, default_value_t = 50)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                role,
                full_name,
            } => {
                commands::user::create(&username, &email, &password, &role, full_name.as_deref())
                    .await?;
            }
        },
        Commands::SyncAutoIncrement { dry_run } => {
            commands::auto_increment::sync(dry_run).await?;
        }
        Commands::Outbox { action } => match action {
            OutboxAction::Replay { limit } => commands::outbox::replay(limit).await?,
        },
    }
    Ok(())
}
