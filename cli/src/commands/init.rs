//! Init Command - Write a starter configuration file

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use battle_fhe::Address;

use crate::config::{default_config_path, BattleConfig};

/// Write a configuration file for a network preset
#[derive(Args)]
pub struct InitCommand {
    /// Battle contract address
    #[arg(long)]
    contract: Option<Address>,

    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, config_path: Option<PathBuf>, network: Option<String>) -> anyhow::Result<()> {
        let path = config_path.unwrap_or_else(default_config_path);
        if path.exists() && !self.force {
            anyhow::bail!("Config already exists at {}. Use --force to overwrite.", path.display());
        }

        let mut config = BattleConfig::for_network(network.as_deref().unwrap_or("sepolia"));
        config.contract.address = self.contract.map(|a| a.to_string());
        config.save(&path)?;

        info!(network = %config.network.name, path = %path.display(), "Configuration written");
        println!("Configuration: {}", path.display());
        println!();
        println!("Keep the signer key out of the file:");
        println!("  export PRIVATE_KEY=0x...");
        if config.contract.address.is_none() {
            println!("  export CONTRACT_ADDRESS=0x...");
        }
        Ok(())
    }
}
