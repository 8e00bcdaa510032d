//! Saffron Kitchen CLI - migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! saffron-cli migrate
//!
//! # Inspect and close delivery zones
//! saffron-cli zones list
//! saffron-cli zones deactivate 11211
//!
//! # Pending orders that never confirmed payment
//! saffron-cli orders stale --minutes 30
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "saffron-cli")]
#[command(author, version, about = "Saffron Kitchen operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect the delivery zone cache
    Zones {
        #[command(subcommand)]
        action: ZoneAction,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ZoneAction {
    /// List cached postal codes and drive times
    List,
    /// Stop delivering to a postal code
    Deactivate {
        /// Postal code to close
        postal_code: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List pending orders older than the given age
    Stale {
        /// Minimum age in minutes
        #[arg(short, long, default_value_t = 30)]
        minutes: u32,
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
        Commands::Migrate => commands::migrate::storefront().await,
        Commands::Zones { action } => match action {
            ZoneAction::List => commands::zones::list().await,
            ZoneAction::Deactivate { postal_code } => {
                commands::zones::deactivate(&postal_code).await
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::Stale { minutes } => commands::orders::stale(minutes).await,
        },
    }
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
    fn test_parses_stale_minutes() {
        let cli = Cli::try_parse_from(["saffron-cli", "orders", "stale", "--minutes", "45"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Orders {
                action: OrderAction::Stale { minutes: 45 }
            })
        ));
    }
}
