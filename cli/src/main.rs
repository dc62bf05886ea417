//! `fleet`: command-line front-end for the fleet catalogue API.

mod commands;
mod config;
mod transport;

use anyhow::Result;
use clap::Parser;
use fleet_core::{App, Connection, EntityStore, FileTokenStorage, FleetClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;
use crate::config::Config;
use crate::transport::UreqTransport;

#[derive(Debug, Parser)]
#[command(name = "fleet", version, about = "Manage segments, brands and vehicles")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleet=warn,fleet_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let token_path = cli.config.token_path();
    tracing::debug!(api_url = %cli.config.api_url, token_path = %token_path.display(), "configuration resolved");

    let conn = Connection::new(FleetClient::new(&cli.config.api_url), UreqTransport::new());
    let store = EntityStore::with_cascade_policy(cli.config.cascade_policy());
    let mut app = App::with_store(conn, FileTokenStorage::new(token_path), store);

    commands::run(&mut app, cli.command, &mut std::io::stdout().lock())
}
