//! Worker Command - Run the operator worker

use clap::Args;
use tokio::signal;
use tracing::{error, info};

use battle_client::ChainClient;
use battle_worker::OperatorWorker;

use crate::config::BattleConfig;

use super::connect_signer;

/// Run the operator worker until interrupted
#[derive(Args)]
pub struct WorkerCommand {
    /// Override the poll interval (seconds)
    #[arg(long)]
    poll_interval: Option<u64>,
}

impl WorkerCommand {
    pub async fn execute(self, mut config: BattleConfig) -> anyhow::Result<()> {
        if let Some(secs) = self.poll_interval {
            config.worker = config.worker.with_poll_interval(secs);
            config.validate()?;
        }

        let client = connect_signer(&config).await?;
        info!(
            network = %config.network.name,
            contract = %client.contract_address(),
            operator = %client.sender(),
            "Starting operator worker"
        );

        let mut worker = OperatorWorker::new(client, config.worker.clone())?;
        if let Err(err) = worker.run(wait_for_shutdown()).await {
            error!(error = %err, "Operator worker halted");
            return Err(err.into());
        }

        info!(battles_ended = worker.state().battles_ended, "Operator worker stopped");
        Ok(())
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
