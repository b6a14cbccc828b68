//! Meme Battle Operator CLI
//!
//! Command-line interface for operating a deployed battle contract.
//!
//! # Usage
//!
//! ```bash
//! # Run the operator worker
//! meme-battle worker --network sepolia
//!
//! # Show the current battle
//! meme-battle status
//!
//! # Last five results
//! meme-battle history --last 5
//!
//! # Owner: shorten battles to ten minutes
//! meme-battle set-duration 600
//!
//! # Write a config file for Zama's devnet
//! meme-battle init --network zama-devnet --contract 0x...
//!
//! # Check the operator role before deploying a worker
//! meme-battle verify
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;

use commands::{
    BalanceCommand, HistoryCommand, InitCommand, SetDurationCommand, SetOperatorCommand, StatusCommand, VerifyCommand,
    WorkerCommand,
};
use config::BattleConfig;

/// Meme Battle operator
#[derive(Parser)]
#[command(name = "meme-battle")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operate an encrypted meme battle contract", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network preset (sepolia, zama-devnet, local)
    #[arg(short, long, global = true, env = "BATTLE_NETWORK")]
    network: Option<String>,

    /// Log level (trace, debug, info, warn, error); defaults to the config file's
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init(InitCommand),

    /// Run the operator worker
    Worker(WorkerCommand),

    /// Show battle and contract state
    Status(StatusCommand),

    /// List completed battles
    History(HistoryCommand),

    /// Change the battle duration (owner only)
    SetDuration(SetDurationCommand),

    /// Change the battle operator (owner only)
    SetOperator(SetOperatorCommand),

    /// Verify the operator role
    Verify(VerifyCommand),

    /// Show signer balance and network
    Balance(BalanceCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init(cmd) = cli.command {
        logging::init(cli.log_level.as_deref().unwrap_or("info"), cli.json_logs)?;
        return cmd.execute(cli.config, cli.network).await;
    }

    let config = BattleConfig::resolve(cli.config.as_deref(), cli.network.as_deref())?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    logging::init(level, cli.json_logs || config.logging.format == "json")?;

    match cli.command {
        // handled before config resolution
        Commands::Init(_) => Ok(()),
        Commands::Worker(cmd) => cmd.execute(config).await,
        Commands::Status(cmd) => cmd.execute(config).await,
        Commands::History(cmd) => cmd.execute(config).await,
        Commands::SetDuration(cmd) => cmd.execute(config).await,
        Commands::SetOperator(cmd) => cmd.execute(config).await,
        Commands::Verify(cmd) => cmd.execute(config).await,
        Commands::Balance(cmd) => cmd.execute(config).await,
    }
}
