#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Preschool capacity services.
//!
//! ```text
//! preschool_server preschool [--port 8081] [--db-path data/preschool.db]
//! preschool_server analytics [--peer-base-url http://localhost:8081]
//! ```

use clap::{Parser, Subcommand};
use preschool_server::config::{ConfigOverrides, ServerConfig, ServiceRole};
use preschool_server::{run_analytics_server, run_preschool_server};

#[derive(Parser)]
#[command(
    name = "preschool_server",
    about = "Kindergarten capacity tracking and analytics services"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve kindergarten records and the municipality report
    Preschool,
    /// Serve coverage, ranking, and projection analytics
    Analytics,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let role = match cli.command {
        Commands::Preschool => ServiceRole::Preschool,
        Commands::Analytics => ServiceRole::Analytics,
    };
    let config = ServerConfig::load(role, cli.overrides)?;

    match role {
        ServiceRole::Preschool => run_preschool_server(config).await?,
        ServiceRole::Analytics => run_analytics_server(config).await?,
    }

    Ok(())
}
