//! CLI Commands

mod admin;
mod balance;
mod init;
mod status;
mod worker;

pub use admin::{SetDurationCommand, SetOperatorCommand, VerifyCommand};
pub use balance::BalanceCommand;
pub use init::InitCommand;
pub use status::{HistoryCommand, StatusCommand};
pub use worker::WorkerCommand;

use battle_client::{EvmChainClient, TimedClient, TimeoutConfig};
use battle_contract::HistoryOutcome;

use crate::config::BattleConfig;

/// Client that can only read
async fn connect_reader(config: &BattleConfig) -> anyhow::Result<TimedClient<EvmChainClient>> {
    let client = EvmChainClient::connect(&config.network.rpc_url, config.contract_address()?, None).await?;
    Ok(TimedClient::new(client, TimeoutConfig::default()))
}

/// Client signing with the configured private key
async fn connect_signer(config: &BattleConfig) -> anyhow::Result<TimedClient<EvmChainClient>> {
    let client = EvmChainClient::connect(
        &config.network.rpc_url,
        config.contract_address()?,
        Some(config.private_key()?),
    )
    .await?;
    Ok(TimedClient::new(client, TimeoutConfig::default()))
}

/// One-line rendering of a history entry's outcome
fn describe_outcome(outcome: HistoryOutcome) -> String {
    match outcome {
        HistoryOutcome::PendingReveal => "awaiting decryption".to_string(),
        HistoryOutcome::NoVotes => "no votes".to_string(),
        HistoryOutcome::Decided(winner) => format!(
            "template {} / caption {} with {} votes",
            winner.template_id, winner.caption_id, winner.votes
        ),
    }
}

/// `90061` → `1d 1h 1m 1s`
fn format_duration(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3600, rest % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}
