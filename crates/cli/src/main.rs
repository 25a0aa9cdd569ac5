//! WhimsicalFrog CLI: migrations and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run migrations (storefront first; admin depends on it)
//! wf-cli migrate storefront
//! wf-cli migrate admin
//! wf-cli migrate all
//!
//! # Accounts
//! wf-cli user create -u kermit -e kermit@example.com -p 'lily-pad-42' --admin
//! wf-cli user promote -u kermit
//!
//! # Load categories, rooms and items
//! wf-cli seed catalog catalog.yaml
//!
//! # Print a new SECRETS_KEY
//! wf-cli secrets generate-key
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wf-cli")]
#[command(author, version, about = "WhimsicalFrog CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Secrets store utilities
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront (`shop` schema) migrations
    Storefront,
    /// Run admin (`admin` schema) migrations
    Admin,
    /// Run storefront then admin migrations
    All,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Give the account the admin role
        #[arg(long)]
        admin: bool,
    },
    /// Give an existing account the admin role
    Promote {
        #[arg(short, long)]
        username: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Categories, SKU rules, rooms and items from a YAML file
    Catalog {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum SecretsAction {
    /// Print a random base64 key for `SECRETS_KEY`
    GenerateKey,
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                password,
                admin,
            } => commands::user::create(&username, &email, &password, admin).await?,
            UserAction::Promote { username } => commands::user::promote(&username).await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Secrets { action } => match action {
            SecretsAction::GenerateKey => {
                #[allow(clippy::print_stdout)]
                {
                    println!("{}", commands::secrets::generate_key());
                }
            }
        },
    }
    Ok(())
}
