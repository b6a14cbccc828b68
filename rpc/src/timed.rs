//! Timeouts and retries around a [`ChainClient`]
//!
//! Reads are idempotent and get a bounded number of attempts on transport
//! errors. Writes are never retried: a second broadcast of the same call is
//! a second transaction. Confirmation is a separate, longer bound.

use std::time::Duration;

use async_trait::async_trait;
use battle_contract::{ContractCall, ViewCall, ViewResult};
use battle_fhe::Address;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::client::ChainClient;
use crate::errors::{ClientError, ClientResult, TxStage};
use crate::types::{Receipt, TxHash, TxStatus};

/// Bounds applied by [`TimedClient`]
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Attempts per read, including the first
    pub read_attempts: u32,
    /// Pause between read attempts
    pub read_backoff: Duration,
    /// Ceiling on handing a transaction to the node
    pub submit_timeout: Duration,
    /// Ceiling on waiting for a receipt
    pub confirm_timeout: Duration,
    /// Receipt polling interval while confirming
    pub receipt_poll: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            read_backoff: Duration::from_secs(1),
            submit_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(60),
            receipt_poll: Duration::from_secs(1),
        }
    }
}

/// Client decorator enforcing [`TimeoutConfig`]
pub struct TimedClient<C> {
    inner: C,
    config: TimeoutConfig,
}

impl<C: ChainClient> TimedClient<C> {
    pub fn new(inner: C, config: TimeoutConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    /// Broadcast `call` and hand back a handle for awaiting its receipt
    pub async fn submit(&self, call: ContractCall) -> ClientResult<PendingTransaction<'_, C>> {
        let hash = self.write(call).await?;
        Ok(PendingTransaction {
            hash,
            client: &self.inner,
            confirm_timeout: self.config.confirm_timeout,
            poll: self.config.receipt_poll,
        })
    }
}

#[async_trait]
impl<C: ChainClient> ChainClient for TimedClient<C> {
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
        let attempts = self.config.read_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.read(call.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(call = call.name(), attempt, error = %err, "Read failed, retrying");
                    sleep(self.config.read_backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn write(&self, call: ContractCall) -> ClientResult<TxHash> {
        let name = call.name();
        match timeout(self.config.submit_timeout, self.inner.write(call)).await {
            Ok(result) => {
                if let Ok(hash) = &result {
                    debug!(call = name, %hash, "Transaction submitted");
                }
                result
            }
            Err(_) => Err(ClientError::TransactionTimeout { stage: TxStage::Submission }),
        }
    }

    async fn receipt(&self, hash: TxHash) -> ClientResult<Option<Receipt>> {
        self.inner.receipt(hash).await
    }

    fn sender(&self) -> Address {
        self.inner.sender()
    }

    fn contract_address(&self) -> Address {
        self.inner.contract_address()
    }
}

/// A broadcast transaction awaiting its receipt
pub struct PendingTransaction<'a, C> {
    hash: TxHash,
    client: &'a C,
    confirm_timeout: Duration,
    poll: Duration,
}

impl<'a, C: ChainClient> PendingTransaction<'a, C> {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Poll for the receipt. A reverted receipt is an error, and running out
    /// of time is a distinct [`TxStage::Confirmation`] timeout.
    pub async fn wait(self) -> ClientResult<Receipt> {
        let hash = self.hash;
        let poll = async {
            loop {
                match self.client.receipt(hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {}
                    Err(err) if err.is_transient() => {
                        debug!(%hash, error = %err, "Receipt query failed, polling again");
                    }
                    Err(err) => return Err(err),
                }
                sleep(self.poll).await;
            }
        };

        let receipt = timeout(self.confirm_timeout, poll)
            .await
            .map_err(|_| ClientError::TransactionTimeout { stage: TxStage::Confirmation })??;

        match receipt.status {
            TxStatus::Success => Ok(receipt),
            TxStatus::Failed => Err(ClientError::TransactionReverted {
                hash,
                reason: receipt.reason,
            }),
        }
    }
}
