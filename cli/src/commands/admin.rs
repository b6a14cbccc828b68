//! Admin Commands - Owner setters and operator verification

use clap::Args;
use tracing::info;

use battle_client::{BattleReads, ChainClient, EvmChainClient, TimedClient};
use battle_contract::constants::{MAX_BATTLE_DURATION, MIN_BATTLE_DURATION};
use battle_contract::ContractCall;
use battle_fhe::Address;

use crate::config::BattleConfig;

use super::{connect_reader, connect_signer, format_duration};

/// Change the battle duration (owner only; applies from the next battle)
#[derive(Args)]
pub struct SetDurationCommand {
    /// New duration in seconds
    seconds: u64,
}

impl SetDurationCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        if !(MIN_BATTLE_DURATION..=MAX_BATTLE_DURATION).contains(&self.seconds) {
            anyhow::bail!(
                "duration must be between {MIN_BATTLE_DURATION} and {MAX_BATTLE_DURATION} seconds, got {}",
                self.seconds
            );
        }

        let client = connect_signer(&config).await?;
        let before = require_owner(&client).await?;
        println!(
            "Battle duration: {} -> {}",
            format_duration(before.battle_duration_seconds),
            format_duration(self.seconds)
        );

        send(&client, ContractCall::SetBattleDuration(self.seconds)).await?;

        let after = client.contract_info().await?;
        if after.battle_duration_seconds != self.seconds {
            anyhow::bail!(
                "duration not applied: contract reports {} seconds",
                after.battle_duration_seconds
            );
        }
        println!("Duration updated; takes effect when the next battle starts");
        Ok(())
    }
}

/// Hand the operator role to another address (owner only)
#[derive(Args)]
pub struct SetOperatorCommand {
    /// New operator address
    operator: Address,
}

impl SetOperatorCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        if self.operator.is_zero() {
            anyhow::bail!("operator must not be the zero address");
        }

        let client = connect_signer(&config).await?;
        let before = require_owner(&client).await?;
        if before.operator == self.operator {
            println!("{} is already the operator", self.operator);
            return Ok(());
        }
        println!("Operator: {} -> {}", before.operator, self.operator);

        send(&client, ContractCall::SetBattleOperator(self.operator)).await?;

        let after = client.contract_info().await?;
        if after.operator != self.operator {
            anyhow::bail!("operator not applied: contract reports {}", after.operator);
        }
        println!("Operator updated");
        Ok(())
    }
}

/// Check that the configured operator holds the on-chain operator role
#[derive(Args)]
pub struct VerifyCommand {
    /// Address to check instead of the configured one
    #[arg(long)]
    address: Option<Address>,
}

impl VerifyCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        let expected = match self.address.or(config.operator_address()?) {
            Some(address) => address,
            None => {
                // Fall back to the signer's own address
                let client = connect_signer(&config).await?;
                client.sender()
            }
        };

        let client = connect_reader(&config).await?;
        let info = client.contract_info().await?;
        println!("On-chain operator: {}", info.operator);
        println!("Expected operator: {}", expected);

        if info.operator != expected {
            anyhow::bail!("{expected} is not the battle operator");
        }
        println!("Operator verified");
        Ok(())
    }
}

/// Read contract info and fail unless the signer owns the contract
async fn require_owner(client: &TimedClient<EvmChainClient>) -> anyhow::Result<battle_contract::ContractInfo> {
    let info = client.contract_info().await?;
    let signer = client.sender();
    if info.owner != signer {
        anyhow::bail!("signer {signer} is not the contract owner ({})", info.owner);
    }
    Ok(info)
}

async fn send(client: &TimedClient<EvmChainClient>, call: ContractCall) -> anyhow::Result<()> {
    let name = call.name();
    let pending = client.submit(call).await?;
    println!("Submitted {name}: {}", pending.hash());
    let receipt = pending.wait().await?;
    info!(call = name, hash = %receipt.hash, block = ?receipt.block_number, "Transaction confirmed");
    println!("Confirmed in block {}", receipt.block_number.unwrap_or_default());
    Ok(())
}
