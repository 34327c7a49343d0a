//! Cartage CLI - database migrations and seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply embedded migrations
//! cartage migrate
//!
//! # Insert the demo catalog (safe to re-run)
//! cartage seed catalog
//!
//! # Create a cart for a manual checkout
//! cartage seed cart --variant TEE-BLK-M:2 --variant MUG-WHT:1
//! ```
//!
//! # Environment Variables
//!
//! - `CARTAGE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::seed::CartLine;

#[derive(Parser)]
#[command(name = "cartage")]
#[command(author, version, about = "Cartage CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Insert demo data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the demo catalog (products and variants)
    Catalog,
    /// Create an active cart holding the given SKUs and print its id
    Cart {
        /// Cart line as `<sku>:<qty>`; repeat for more lines
        #[arg(short, long = "variant", required = true, value_parser = CartLine::parse)]
        variants: Vec<CartLine>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Seed { target } => match target {
            SeedTarget::Catalog => commands::seed::catalog().await?,
            SeedTarget::Cart { variants } => {
                let cart = commands::seed::cart(&variants).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{cart}");
                }
            }
        },
    }
    Ok(())
}
