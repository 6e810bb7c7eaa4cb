//! Shopdesk CLI - Database migrations and admin bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopdesk-cli migrate
//!
//! # Create the first admin user (password may come from SHOPDESK_ADMIN_PASSWORD)
//! shopdesk-cli admin create -e admin@example.com -n "Admin Name" -p 's3cret-passphrase'
//!
//! # Grant admin to an existing user
//! shopdesk-cli admin promote -e someone@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopdesk-cli")]
#[command(author, version, about = "Shopdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin password (hashed with Argon2id before storage)
        #[arg(short, long, env = "SHOPDESK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Grant admin to an existing user
    Promote {
        /// Email address of the user
        #[arg(short, long)]
        email: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, password.into()).await?;
            }
            AdminAction::Promote { email } => {
                commands::admin::promote_user(&email).await?;
            }
        },
    }
    Ok(())
}
