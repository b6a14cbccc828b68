//! Balance Command - Signer funds and network check

use clap::Args;
use ethers::utils::format_ether;

use battle_client::evm::is_fhe_network;
use battle_client::ChainClient;

use crate::config::BattleConfig;

use super::connect_signer;

/// Show the signer's balance and what network the RPC endpoint serves
#[derive(Args)]
pub struct BalanceCommand;

impl BalanceCommand {
    pub async fn execute(self, config: BattleConfig) -> anyhow::Result<()> {
        let client = connect_signer(&config).await?;
        let evm = client.inner();
        let signer = client.sender();
        let balance = evm.balance(signer).await?;
        let chain_id = evm.chain_id().await?;

        println!("Signer:     {}", signer);
        println!("Balance:    {} ETH", format_ether(balance));
        println!("Chain ID:   {}", chain_id);

        if chain_id != config.network.chain_id {
            println!(
                "Warning:    RPC serves chain {chain_id} but {} expects {}",
                config.network.name, config.network.chain_id
            );
        }
        if is_fhe_network(chain_id) {
            println!("FHE:        supported");
        } else {
            println!("FHE:        chain {chain_id} is not a known FHE-enabled network; encrypted votes will fail");
        }
        if balance.is_zero() {
            anyhow::bail!("signer {signer} has no funds for gas");
        }
        if !evm.is_deployed().await? {
            anyhow::bail!("no contract deployed at {}", evm.contract_address());
        }
        Ok(())
    }
}
