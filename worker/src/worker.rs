//! Operator worker loop

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use battle_client::{BattleReads, ChainClient, TxHash};
use battle_contract::ContractCall;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::decide::{self, Plan, ReceiptObservation, ReceiptOutcome, SkipReason, SubmitOutcome};
use crate::errors::{WorkerError, WorkerResult};
use crate::state::WorkerState;

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// In-flight transaction still has no receipt (or the lookup failed)
    AwaitingReceipt { hash: TxHash },
    Submitted { battle_number: u64, hash: TxHash },
    /// Another worker got there first
    AlreadyEnded { battle_number: u64 },
    /// Read or submit failed; retried next tick
    RetryLater { reason: String },
}

/// Seconds since the unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Ends expired battles for the operator key behind `client`
pub struct OperatorWorker<C> {
    client: C,
    config: WorkerConfig,
    state: WorkerState,
}

impl<C: ChainClient> OperatorWorker<C> {
    pub fn new(client: C, config: WorkerConfig) -> WorkerResult<Self> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            state: WorkerState::default(),
        })
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fail unless the signer is the on-chain operator
    pub async fn verify_authorization(&self) -> WorkerResult<()> {
        let info = self.client.contract_info().await?;
        let signer = self.client.sender();
        if info.operator != signer {
            return Err(WorkerError::NotOperator {
                operator: info.operator,
                signer,
            });
        }
        info!(operator = %signer, "Operator authorization verified");
        Ok(())
    }

    /// One poll cycle at time `now`
    pub async fn tick(&mut self, now: u64) -> WorkerResult<TickOutcome> {
        if let Some(tx) = self.state.in_flight {
            let observation = ReceiptObservation::from_query(self.client.receipt(tx.hash).await);
            let (outcome, next) = decide::on_receipt(self.state.clone(), observation, now, &self.config);
            self.state = next;

            match outcome {
                ReceiptOutcome::Confirmed(tx) => {
                    info!(
                        battle = tx.battle_number,
                        hash = %tx.hash,
                        total_ended = self.state.battles_ended,
                        "Battle ended"
                    );
                }
                ReceiptOutcome::Failed(tx) => {
                    warn!(battle = tx.battle_number, hash = %tx.hash, "endBattle reverted, re-evaluating");
                }
                ReceiptOutcome::Stale(tx) => {
                    warn!(battle = tx.battle_number, hash = %tx.hash, "No receipt for too long, dropping tx");
                }
                ReceiptOutcome::QueryFailed(tx) => {
                    warn!(hash = %tx.hash, "Receipt query failed, will retry");
                }
                ReceiptOutcome::StillPending(_) | ReceiptOutcome::Idle => {}
            }
            if !outcome.falls_through() {
                return Ok(match outcome {
                    ReceiptOutcome::Confirmed(_) => TickOutcome::Skipped(SkipReason::Cooldown {
                        until: self.state.cooldown_until.unwrap_or(now),
                    }),
                    _ => TickOutcome::AwaitingReceipt { hash: tx.hash },
                });
            }
        }

        if let Some(reason) = decide::gate(&self.state, now) {
            debug!(?reason, "Skipping tick");
            return Ok(TickOutcome::Skipped(reason));
        }

        let info = match self.client.battle_info().await {
            Ok(info) => info,
            Err(err) => {
                warn!(error = %err, "Failed to read battle info");
                return Ok(TickOutcome::RetryLater { reason: err.to_string() });
            }
        };

        let battle_number = match decide::plan(&self.state, &info, now, &self.config) {
            Plan::Skip(reason) => {
                debug!(?reason, battle = info.battle_number, "Nothing to do");
                return Ok(TickOutcome::Skipped(reason));
            }
            Plan::EndBattle { battle_number } => battle_number,
        };

        info!(battle = battle_number, total_votes = info.total_votes, "Battle expired, ending");
        match self.client.write(ContractCall::EndBattle).await {
            Ok(hash) => {
                self.state = decide::on_submitted(self.state.clone(), battle_number, hash, now);
                info!(battle = battle_number, %hash, "endBattle submitted");
                Ok(TickOutcome::Submitted { battle_number, hash })
            }
            Err(err) => {
                let (outcome, next) = decide::on_submit_error(self.state.clone(), battle_number, &err, now);
                self.state = next;
                match outcome {
                    SubmitOutcome::Fatal => {
                        error!(battle = battle_number, "Signer is no longer authorized to end battles");
                        Err(WorkerError::Unauthorized { battle_number })
                    }
                    SubmitOutcome::AlreadyEnded { battle_number } => {
                        info!(battle = battle_number, "Battle already ended by another worker");
                        Ok(TickOutcome::AlreadyEnded { battle_number })
                    }
                    SubmitOutcome::Retry { reason } => {
                        warn!(battle = battle_number, %reason, "endBattle submission failed, will retry");
                        Ok(TickOutcome::RetryLater { reason })
                    }
                }
            }
        }
    }

    /// Poll until `shutdown` resolves or a fatal error occurs
    pub async fn run<F>(&mut self, shutdown: F) -> WorkerResult<()>
    where
        F: Future<Output = ()>,
    {
        self.verify_authorization().await?;

        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            sender = %self.client.sender(),
            "Operator worker started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(battles_ended = self.state.battles_ended, "Operator worker stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.tick(unix_now()).await {
                        if err.is_fatal() {
                            return Err(err);
                        }
                        warn!(error = %err, "Tick failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use battle_client::{ClientError, ClientResult, Receipt, RevertKind, TxStatus};
    use battle_contract::{BattleInfo, ContractInfo, ViewCall, ViewResult};
    use battle_fhe::Address;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    const NOW: u64 = 50_000;

    /// Client with scripted chain answers
    struct FakeChain {
        info: Mutex<BattleInfo>,
        operator: Address,
        write_results: Mutex<VecDeque<ClientResult<TxHash>>>,
        receipts: Mutex<VecDeque<ClientResult<Option<Receipt>>>>,
        writes: Mutex<u32>,
    }

    impl FakeChain {
        fn new(battle_number: u64, ends_at: u64) -> Self {
            Self {
                info: Mutex::new(BattleInfo {
                    active: true,
                    ends_at,
                    template_count: 5,
                    caption_count: 10,
                    total_votes: 2,
                    battle_number,
                }),
                operator: Address::from_label("operator"),
                write_results: Mutex::new(VecDeque::new()),
                receipts: Mutex::new(VecDeque::new()),
                writes: Mutex::new(0),
            }
        }

        fn push_receipt(&self, status: TxStatus) {
            self.receipts.lock().push_back(Ok(Some(Receipt {
                hash: TxHash([1; 32]),
                status,
                block_number: Some(9),
                reason: None,
                events: Vec::new(),
            })));
        }
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
            Ok(match call {
                ViewCall::BattleInfo => ViewResult::BattleInfo(self.info.lock().clone()),
                ViewCall::ContractInfo => ViewResult::ContractInfo(ContractInfo {
                    max_templates: 10,
                    max_captions: 256,
                    current_templates: 5,
                    current_captions: 10,
                    battle_duration_seconds: 3600,
                    total_completed_battles: 0,
                    owner: Address::from_label("owner"),
                    operator: self.operator,
                }),
                other => return Err(ClientError::InvalidResponse(other.name().into())),
            })
        }

        async fn write(&self, _call: ContractCall) -> ClientResult<TxHash> {
            *self.writes.lock() += 1;
            self.write_results.lock().pop_front().unwrap_or(Ok(TxHash([1; 32])))
        }

        async fn receipt(&self, _hash: TxHash) -> ClientResult<Option<Receipt>> {
            self.receipts.lock().pop_front().unwrap_or(Ok(None))
        }

        fn sender(&self) -> Address {
            Address::from_label("operator")
        }

        fn contract_address(&self) -> Address {
            Address::from_label("battle")
        }
    }

    fn worker(chain: FakeChain) -> OperatorWorker<FakeChain> {
        OperatorWorker::new(chain, WorkerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_submits_once_and_waits_for_receipt() {
        let mut w = worker(FakeChain::new(5, NOW - 1));

        let first = w.tick(NOW).await.unwrap();
        assert!(matches!(first, TickOutcome::Submitted { battle_number: 5, .. }));

        // no receipt yet: no resubmission
        let second = w.tick(NOW + 30).await.unwrap();
        assert!(matches!(second, TickOutcome::AwaitingReceipt { .. }));
        assert_eq!(*w.client().writes.lock(), 1);

        w.client().push_receipt(TxStatus::Success);
        let third = w.tick(NOW + 60).await.unwrap();
        assert!(matches!(third, TickOutcome::Skipped(SkipReason::Cooldown { .. })));
        assert_eq!(w.state().battles_ended, 1);
        assert!(w.state().in_flight.is_none());
    }

    #[tokio::test]
    async fn test_processed_battle_not_resubmitted() {
        let mut w = worker(FakeChain::new(5, NOW - 1));
        w.tick(NOW).await.unwrap();
        w.client().push_receipt(TxStatus::Success);
        w.tick(NOW + 30).await.unwrap();

        // chain read lags and still reports battle 5 after the cooldown
        let outcome = w.tick(NOW + 90).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::AlreadyProcessed { battle_number: 5 }));
        assert_eq!(*w.client().writes.lock(), 1);
    }

    #[tokio::test]
    async fn test_reverted_receipt_reevaluates() {
        let mut w = worker(FakeChain::new(5, NOW - 1));
        w.tick(NOW).await.unwrap();

        w.client().push_receipt(TxStatus::Failed);
        let outcome = w.tick(NOW + 30).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Submitted { battle_number: 5, .. }));
        assert_eq!(*w.client().writes.lock(), 2);
    }

    #[tokio::test]
    async fn test_lost_race_is_not_fatal() {
        let chain = FakeChain::new(5, NOW - 1);
        chain
            .write_results
            .lock()
            .push_back(Err(ClientError::Reverted(RevertKind::BattleStillActive)));
        let mut w = worker(chain);

        let outcome = w.tick(NOW).await.unwrap();
        assert_eq!(outcome, TickOutcome::AlreadyEnded { battle_number: 5 });
        assert!(w.state().is_processed(5, NOW, 300));
        assert_eq!(w.state().battles_ended, 0);
    }

    #[tokio::test]
    async fn test_not_authorized_is_fatal() {
        let chain = FakeChain::new(5, NOW - 1);
        chain
            .write_results
            .lock()
            .push_back(Err(ClientError::Reverted(RevertKind::NotAuthorized)));
        let mut w = worker(chain);

        let err = w.tick(NOW).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_nonce_conflict_retries_next_tick() {
        let chain = FakeChain::new(5, NOW - 1);
        chain.write_results.lock().push_back(Err(ClientError::NonceConflict));
        let mut w = worker(chain);

        assert!(matches!(w.tick(NOW).await.unwrap(), TickOutcome::RetryLater { .. }));
        assert!(matches!(w.tick(NOW + 30).await.unwrap(), TickOutcome::Submitted { .. }));
    }

    #[tokio::test]
    async fn test_not_expired_skips() {
        let mut w = worker(FakeChain::new(5, NOW + 100));
        let outcome = w.tick(NOW).await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Skipped(SkipReason::NotExpired { battle_number: 5, seconds_left: 100 })
        );
        assert_eq!(*w.client().writes.lock(), 0);
    }

    #[tokio::test]
    async fn test_verify_authorization() {
        let w = worker(FakeChain::new(1, NOW));
        assert!(w.verify_authorization().await.is_ok());

        let mut chain = FakeChain::new(1, NOW);
        chain.operator = Address::from_label("someone-else");
        let w = worker(chain);
        let err = w.verify_authorization().await.unwrap_err();
        assert!(matches!(err, WorkerError::NotOperator { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let mut w = worker(FakeChain::new(1, u64::MAX));
        let shutdown = tokio::time::sleep(std::time::Duration::from_secs(95));
        w.run(shutdown).await.unwrap();
        assert_eq!(*w.client().writes.lock(), 0);
    }

    #[tokio::test]
    async fn test_run_refuses_non_operator() {
        let mut chain = FakeChain::new(1, NOW);
        chain.operator = Address::from_label("someone-else");
        let mut w = worker(chain);
        let result = w.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(WorkerError::NotOperator { .. })));
    }
}
