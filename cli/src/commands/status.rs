//! Status and History Commands - Read-only views of the contract

use clap::Args;
use serde_json::json;

use battle_client::BattleReads;
use battle_worker::unix_now;

use crate::config::BattleConfig;

use super::{connect_reader, describe_outcome, format_duration};

/// Show the current battle and contract state
#[derive(Args)]
pub struct StatusCommand {
    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

impl StatusCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        let client = connect_reader(&config).await?;
        let info = client.battle_info().await?;
        let contract = client.contract_info().await?;
        let latest = client.latest_completed_battle().await?;
        let now = unix_now();

        if self.json {
            let latest = latest.map(|entry| {
                json!({
                    "battleNumber": entry.battle_number,
                    "endTimestamp": entry.end_timestamp,
                    "totalParticipants": entry.total_participants,
                    "revealed": entry.revealed,
                    "winner": entry.winner,
                })
            });
            let report = json!({
                "network": config.network.name,
                "contract": contract_address(&config)?,
                "battle": {
                    "number": info.battle_number,
                    "active": info.active,
                    "endsAt": info.ends_at,
                    "secondsLeft": info.seconds_left(now),
                    "expired": info.is_expired(now),
                    "totalVotes": info.total_votes,
                    "templateCount": info.template_count,
                    "captionCount": info.caption_count,
                },
                "contractInfo": {
                    "owner": contract.owner.to_string(),
                    "operator": contract.operator.to_string(),
                    "battleDurationSeconds": contract.battle_duration_seconds,
                    "completedBattles": contract.total_completed_battles,
                    "maxTemplates": contract.max_templates,
                    "maxCaptions": contract.max_captions,
                },
                "latestCompleted": latest,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Network:          {} (chain {})", config.network.name, config.network.chain_id);
        println!("Contract:         {}", contract_address(&config)?);
        println!("Owner:            {}", contract.owner);
        println!("Operator:         {}", contract.operator);
        println!();
        println!("Battle:           #{}", info.battle_number);
        println!("Active:           {}", if info.active { "yes" } else { "no" });
        println!("Templates:        {}", info.template_count);
        println!("Captions:         {}", info.caption_count);
        println!("Votes:            {}", info.total_votes);
        if info.is_expired(now) {
            println!("Time left:        expired, waiting for the operator");
        } else {
            println!("Time left:        {}", format_duration(info.seconds_left(now)));
        }
        println!("Duration:         {}", format_duration(contract.battle_duration_seconds));
        println!("Completed:        {}", contract.total_completed_battles);

        if let Some(entry) = latest {
            println!();
            println!(
                "Latest result:    #{} ({} participants): {}",
                entry.battle_number,
                entry.total_participants,
                describe_outcome(entry.outcome())
            );
        }

        Ok(())
    }
}

/// List completed battles, newest first
#[derive(Args)]
pub struct HistoryCommand {
    /// Number of battles to show
    #[arg(long, default_value = "10")]
    last: u64,
}

impl HistoryCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        if self.last == 0 {
            anyhow::bail!("--last must be at least 1");
        }

        let client = connect_reader(&config).await?;
        let completed = client.completed_battle_count().await?;
        if completed == 0 {
            println!("No completed battles yet");
            return Ok(());
        }

        let first = completed.saturating_sub(self.last) + 1;
        println!("{:>8}  {:>12}  {:>12}  Outcome", "Battle", "Ended", "Participants");
        for battle_number in (first..=completed).rev() {
            let entry = client.battle_history(battle_number).await?;
            println!(
                "{:>8}  {:>12}  {:>12}  {}",
                format!("#{}", entry.battle_number),
                entry.end_timestamp,
                entry.total_participants,
                describe_outcome(entry.outcome())
            );
        }

        Ok(())
    }
}

fn contract_address(config: &BattleConfig) -> anyhow::Result<String> {
    Ok(config.contract_address()?.to_string())
}
