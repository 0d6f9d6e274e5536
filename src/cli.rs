//! Command-line interface for tictactoe_duel.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tic-tac-toe for two on one keyboard, against the CPU, or peer to peer
#[derive(Parser, Debug)]
#[command(name = "tictactoe_duel")]
#[command(about = "Terminal tic-tac-toe with local, CPU and peer-to-peer modes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "tictactoe_duel.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play in the terminal
    Play {
        /// Address to dial when joining, overrides `network.peer_host`
        #[arg(long)]
        peer_host: Option<String>,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}
