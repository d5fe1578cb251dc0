//! Convention CLI - Database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run ticket shop migrations
//! conv-cli migrate
//!
//! # Create an event with two products
//! conv-cli seed --slug tracon2026 --name "Tracon 2026" --homepage https://2026.tracon.fi \
//!     --product "Weekend ticket:3500:2000" --product "Saturday ticket:2500"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::seed::ProductSpec;

#[derive(Parser)]
#[command(name = "conv-cli")]
#[command(author, version, about = "Convention ticket shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create or update an event and add products to it
    Seed {
        /// URL slug of the event
        #[arg(short, long)]
        slug: String,

        /// Display name of the event
        #[arg(short, long)]
        name: String,

        /// Event homepage, where cancelled buyers are sent
        #[arg(long)]
        homepage: String,

        /// Product as `NAME:CENTS[:STOCK]`, may be repeated
        #[arg(short, long = "product")]
        products: Vec<ProductSpec>,
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
        Commands::Seed {
            slug,
            name,
            homepage,
            products,
        } => commands::seed::event(&slug, &name, &homepage, &products).await?,
    }
    Ok(())
}
