//! tictactoe_duel - terminal tic-tac-toe

use anyhow::{Context, Result};
use clap::Parser;
use tictactoe_duel::DuelConfig;
use tictactoe_duel::cli::{Cli, Command};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = DuelConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Play { peer_host } => run_play(config, peer_host).await,
        Command::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Run the terminal game
async fn run_play(mut config: DuelConfig, peer_host: Option<String>) -> Result<()> {
    if let Some(host) = peer_host {
        let network = config.network().clone().with_peer_host(host);
        config = config.with_network(network);
    }
    config.validate()?;

    tictactoe_duel::logging::init_logging(config.logging())
        .with_context(|| format!("creating log file {}", config.logging().file()))?;
    info!(transport = %config.network().transport(), "Starting tictactoe_duel");

    let transport = tictactoe_duel::transport_from_config(&config);
    tictactoe_duel::tui::run_terminal(&config, transport).await
}
