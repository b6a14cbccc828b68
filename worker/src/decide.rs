//! Pure decision logic
//!
//! Every function here maps `(observation, state, now)` to a decision and
//! the next state. The async loop in [`crate::worker`] does the I/O and
//! nothing else, so all of the exactly-once reasoning is tested here.

use battle_client::{ClientError, Receipt, RevertKind, TxHash, TxStatus};
use battle_contract::BattleInfo;

use crate::config::WorkerConfig;
use crate::state::{InFlight, WorkerState};

/// Result of asking the node for the in-flight transaction's receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptObservation {
    Pending,
    Mined(TxStatus),
    QueryFailed(String),
}

impl ReceiptObservation {
    pub fn from_query(result: Result<Option<Receipt>, ClientError>) -> Self {
        match result {
            Ok(None) => ReceiptObservation::Pending,
            Ok(Some(receipt)) => ReceiptObservation::Mined(receipt.status),
            Err(err) => ReceiptObservation::QueryFailed(err.to_string()),
        }
    }
}

/// What happened to the in-flight transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// Nothing in flight
    Idle,
    /// No receipt yet; do nothing this tick
    StillPending(InFlight),
    /// Receipt lookup failed; keep tracking
    QueryFailed(InFlight),
    /// Mined successfully
    Confirmed(InFlight),
    /// Mined but reverted; re-evaluate from chain state
    Failed(InFlight),
    /// No receipt for too long; dropped from tracking
    Stale(InFlight),
}

impl ReceiptOutcome {
    /// Whether the tick should go on to read battle state
    pub fn falls_through(&self) -> bool {
        matches!(
            self,
            ReceiptOutcome::Idle | ReceiptOutcome::Failed(_) | ReceiptOutcome::Stale(_)
        )
    }
}

/// Fold a receipt observation into the state
pub fn on_receipt(
    mut state: WorkerState,
    observation: ReceiptObservation,
    now: u64,
    config: &WorkerConfig,
) -> (ReceiptOutcome, WorkerState) {
    let Some(tx) = state.in_flight else {
        return (ReceiptOutcome::Idle, state);
    };

    let outcome = match observation {
        ReceiptObservation::Mined(TxStatus::Success) => {
            state.in_flight = None;
            state.mark_processed(tx.battle_number, now);
            state.cooldown_until = Some(now + config.cooldown_secs);
            state.battles_ended += 1;
            ReceiptOutcome::Confirmed(tx)
        }
        ReceiptObservation::Mined(TxStatus::Failed) => {
            state.in_flight = None;
            ReceiptOutcome::Failed(tx)
        }
        ReceiptObservation::Pending if now.saturating_sub(tx.submitted_at) >= config.stale_tx_timeout_secs => {
            state.in_flight = None;
            ReceiptOutcome::Stale(tx)
        }
        ReceiptObservation::Pending => ReceiptOutcome::StillPending(tx),
        ReceiptObservation::QueryFailed(_) => ReceiptOutcome::QueryFailed(tx),
    };
    (outcome, state)
}

/// Why a tick does not read or act
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Cooldown { until: u64 },
    AlreadyProcessed { battle_number: u64 },
    NotExpired { battle_number: u64, seconds_left: u64 },
    Inactive,
}

/// Checks that need no chain read
pub fn gate(state: &WorkerState, now: u64) -> Option<SkipReason> {
    if state.in_flight.is_some() {
        return Some(SkipReason::InFlight);
    }
    match state.cooldown_until {
        Some(until) if state.in_cooldown(now) => Some(SkipReason::Cooldown { until }),
        _ => None,
    }
}

/// Decision after reading battle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Skip(SkipReason),
    EndBattle { battle_number: u64 },
}

pub fn plan(state: &WorkerState, info: &BattleInfo, now: u64, config: &WorkerConfig) -> Plan {
    if state.is_processed(info.battle_number, now, config.processed_ttl_secs) {
        return Plan::Skip(SkipReason::AlreadyProcessed {
            battle_number: info.battle_number,
        });
    }
    if !info.active {
        return Plan::Skip(SkipReason::Inactive);
    }
    if !info.is_expired(now) {
        return Plan::Skip(SkipReason::NotExpired {
            battle_number: info.battle_number,
            seconds_left: info.seconds_left(now),
        });
    }
    Plan::EndBattle {
        battle_number: info.battle_number,
    }
}

/// Record a broadcast `endBattle`
pub fn on_submitted(mut state: WorkerState, battle_number: u64, hash: TxHash, now: u64) -> WorkerState {
    state.in_flight = Some(InFlight {
        hash,
        battle_number,
        submitted_at: now,
    });
    state
}

/// What to do after `endBattle` could not be broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Signer lost the operator role; halt
    Fatal,
    /// Someone else already ended the battle
    AlreadyEnded { battle_number: u64 },
    /// Try again on a later tick
    Retry { reason: String },
}

pub fn on_submit_error(
    mut state: WorkerState,
    battle_number: u64,
    err: &ClientError,
    now: u64,
) -> (SubmitOutcome, WorkerState) {
    state.in_flight = None;
    let outcome = match err {
        ClientError::Reverted(RevertKind::NotAuthorized) => SubmitOutcome::Fatal,
        ClientError::Reverted(RevertKind::BattleStillActive) => {
            state.mark_processed(battle_number, now);
            SubmitOutcome::AlreadyEnded { battle_number }
        }
        ClientError::NonceConflict => SubmitOutcome::Retry {
            reason: "nonce conflict".into(),
        },
        other => SubmitOutcome::Retry {
            reason: other.to_string(),
        },
    };
    (outcome, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: u64 = 10_000;

    fn config() -> WorkerConfig {
        WorkerConfig::default()
    }

    fn info(battle_number: u64, ends_at: u64) -> BattleInfo {
        BattleInfo {
            active: true,
            ends_at,
            template_count: 5,
            caption_count: 10,
            total_votes: 3,
            battle_number,
        }
    }

    fn in_flight(battle_number: u64, submitted_at: u64) -> WorkerState {
        on_submitted(WorkerState::default(), battle_number, TxHash([7; 32]), submitted_at)
    }

    #[test]
    fn test_pending_receipt_waits() {
        let state = in_flight(5, NOW);
        let (outcome, next) = on_receipt(state.clone(), ReceiptObservation::Pending, NOW + 30, &config());
        assert!(matches!(outcome, ReceiptOutcome::StillPending(_)));
        assert!(!outcome.falls_through());
        assert_eq!(next, state);
    }

    #[test]
    fn test_success_marks_processed_and_cools_down() {
        let (outcome, next) = on_receipt(
            in_flight(5, NOW),
            ReceiptObservation::Mined(TxStatus::Success),
            NOW + 30,
            &config(),
        );
        assert!(matches!(outcome, ReceiptOutcome::Confirmed(tx) if tx.battle_number == 5));
        assert!(next.in_flight.is_none());
        assert!(next.is_processed(5, NOW + 31, 300));
        assert_eq!(next.cooldown_until, Some(NOW + 60));
        assert_eq!(next.battles_ended, 1);
    }

    #[test]
    fn test_failed_receipt_falls_through() {
        let (outcome, next) = on_receipt(
            in_flight(5, NOW),
            ReceiptObservation::Mined(TxStatus::Failed),
            NOW + 30,
            &config(),
        );
        assert!(outcome.falls_through());
        assert!(next.in_flight.is_none());
        assert!(next.last_processed.is_none());
        assert_eq!(next.battles_ended, 0);
    }

    #[test]
    fn test_query_error_keeps_tracking() {
        let state = in_flight(5, NOW);
        let (outcome, next) = on_receipt(
            state.clone(),
            ReceiptObservation::QueryFailed("timeout".into()),
            NOW + 30,
            &config(),
        );
        assert!(matches!(outcome, ReceiptOutcome::QueryFailed(_)));
        assert!(!outcome.falls_through());
        assert_eq!(next, state);
    }

    #[test]
    fn test_stale_transaction_dropped() {
        let (outcome, next) = on_receipt(
            in_flight(5, NOW),
            ReceiptObservation::Pending,
            NOW + config().stale_tx_timeout_secs,
            &config(),
        );
        assert!(matches!(outcome, ReceiptOutcome::Stale(_)));
        assert!(outcome.falls_through());
        assert!(next.in_flight.is_none());
    }

    #[test]
    fn test_gate() {
        assert_eq!(gate(&WorkerState::default(), NOW), None);
        assert_eq!(gate(&in_flight(1, NOW), NOW), Some(SkipReason::InFlight));
        let cooling = WorkerState {
            cooldown_until: Some(NOW + 5),
            ..Default::default()
        };
        assert_eq!(gate(&cooling, NOW), Some(SkipReason::Cooldown { until: NOW + 5 }));
        assert_eq!(gate(&cooling, NOW + 5), None);
    }

    #[test]
    fn test_plan_ends_expired_battle() {
        let state = WorkerState::default();
        assert_eq!(plan(&state, &info(5, NOW), NOW, &config()), Plan::EndBattle { battle_number: 5 });
        assert_eq!(
            plan(&state, &info(5, NOW + 1), NOW, &config()),
            Plan::Skip(SkipReason::NotExpired { battle_number: 5, seconds_left: 1 })
        );
        let inactive = BattleInfo { active: false, ..info(5, NOW) };
        assert_eq!(plan(&state, &inactive, NOW, &config()), Plan::Skip(SkipReason::Inactive));
    }

    #[test]
    fn test_plan_skips_processed_until_ttl() {
        let mut state = WorkerState::default();
        state.mark_processed(5, NOW);
        assert_eq!(
            plan(&state, &info(5, NOW - 10), NOW + 10, &config()),
            Plan::Skip(SkipReason::AlreadyProcessed { battle_number: 5 })
        );
        // the next battle is not affected
        assert_eq!(plan(&state, &info(6, NOW), NOW + 10, &config()), Plan::EndBattle { battle_number: 6 });
        // a stale marker no longer blocks
        let later = NOW + config().processed_ttl_secs;
        assert_eq!(plan(&state, &info(5, NOW - 10), later, &config()), Plan::EndBattle { battle_number: 5 });
    }

    #[test]
    fn test_submit_error_not_authorized_is_fatal() {
        let err = ClientError::Reverted(RevertKind::NotAuthorized);
        let (outcome, _) = on_submit_error(WorkerState::default(), 5, &err, NOW);
        assert_eq!(outcome, SubmitOutcome::Fatal);
    }

    #[test]
    fn test_submit_error_still_active_marks_processed() {
        let err = ClientError::Reverted(RevertKind::BattleStillActive);
        let (outcome, next) = on_submit_error(WorkerState::default(), 5, &err, NOW);
        assert_eq!(outcome, SubmitOutcome::AlreadyEnded { battle_number: 5 });
        assert!(next.is_processed(5, NOW, 300));
        assert_eq!(next.battles_ended, 0);
    }

    #[test]
    fn test_submit_error_transient_retries() {
        for err in [ClientError::NonceConflict, ClientError::Network("reset".into())] {
            let (outcome, next) = on_submit_error(in_flight(5, NOW), 5, &err, NOW);
            assert!(matches!(outcome, SubmitOutcome::Retry { .. }));
            assert!(next.in_flight.is_none());
            assert!(next.last_processed.is_none());
        }
    }

    // =========================================================================
    // TICK SEQUENCES
    // =========================================================================

    fn observation() -> impl Strategy<Value = ReceiptObservation> {
        prop_oneof![
            Just(ReceiptObservation::Pending),
            Just(ReceiptObservation::Mined(TxStatus::Success)),
            Just(ReceiptObservation::Mined(TxStatus::Failed)),
            Just(ReceiptObservation::QueryFailed("timeout".into())),
        ]
    }

    proptest! {
        /// Drives the same sequence as `OperatorWorker::tick` with arbitrary
        /// receipts and chain reads; battle numbers never go backwards.
        #[test]
        fn never_double_submits(
            steps in prop::collection::vec(
                (0u64..120, observation(), 0u64..2, any::<bool>(), any::<bool>()),
                1..60,
            )
        ) {
            let cfg = config();
            let mut state = WorkerState::default();
            let mut now = NOW;
            let mut battle = 1u64;
            let mut confirmed: Option<(u64, u64)> = None;
            let mut successes = 0u64;

            for (i, (advance, observed, bump, expired, write_ok)) in steps.into_iter().enumerate() {
                now += advance;
                battle += bump;

                if state.in_flight.is_some() {
                    let (outcome, next) = on_receipt(state, observed, now, &cfg);
                    state = next;
                    if let ReceiptOutcome::Confirmed(tx) = outcome {
                        successes += 1;
                        confirmed = Some((tx.battle_number, now));
                    }
                    if !outcome.falls_through() {
                        continue;
                    }
                }
                if gate(&state, now).is_some() {
                    continue;
                }

                let ends_at = if expired { now } else { now + 60 };
                if let Plan::EndBattle { battle_number } = plan(&state, &info(battle, ends_at), now, &cfg) {
                    prop_assert!(state.in_flight.is_none());
                    if let Some((done, at)) = confirmed {
                        prop_assert!(done != battle_number || now - at >= cfg.processed_ttl_secs);
                    }
                    if write_ok {
                        state = on_submitted(state, battle_number, TxHash([i as u8; 32]), now);
                    } else {
                        let err = ClientError::Reverted(RevertKind::BattleStillActive);
                        state = on_submit_error(state, battle_number, &err, now).1;
                    }
                }
            }

            prop_assert_eq!(state.battles_ended, successes);
        }
    }
}
