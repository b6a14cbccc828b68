//! End-to-end battle lifecycle on the local devnet
//!
//! Voters encrypt through the gateway, the operator worker ends the battle,
//! the oracle reveals the tallies and the result lands in history.

use std::sync::Arc;

use meme_battle::client::{fetch_snapshot, TimeoutConfig, VoteError, VoteSubmitter};
use meme_battle::contract::HistoryOutcome;
use meme_battle::fhe::LocalGateway;
use meme_battle::prelude::*;

const DURATION: u64 = 3600;

fn devnet() -> Arc<LocalDevnet> {
    let config = DevnetConfig {
        auto_mine: true,
        ..Default::default()
    };
    LocalDevnet::start(config, DevnetAccounts::default()).unwrap()
}

fn voter(net: &Arc<LocalDevnet>, label: &str) -> VoteSubmitter<DevnetClient, LocalGateway> {
    let client = TimedClient::new(net.client(Address::from_label(label)), TimeoutConfig::default());
    VoteSubmitter::new(client, net.gateway())
}

fn operator(net: &Arc<LocalDevnet>) -> OperatorWorker<DevnetClient> {
    OperatorWorker::new(net.client(net.accounts().operator), WorkerConfig::default()).unwrap()
}

/// Expire the current battle, end it through the worker and reveal it
async fn end_and_reveal(net: &Arc<LocalDevnet>, worker: &mut OperatorWorker<DevnetClient>) -> u64 {
    net.advance_time(DURATION);
    let battle_number = match worker.tick(net.now()).await.unwrap() {
        TickOutcome::Submitted { battle_number, .. } => battle_number,
        other => panic!("expected a submission, got {other:?}"),
    };
    // picks up the receipt
    worker.tick(net.now()).await.unwrap();
    assert_eq!(net.fulfill_decryptions(), 1);
    battle_number
}

// =============================================================================
// ROUND TRIP
// =============================================================================

#[tokio::test]
async fn test_encrypt_vote_end_decrypt_round_trip() {
    let net = devnet();
    let mut worker = operator(&net);
    worker.verify_authorization().await.unwrap();

    for label in ["alice", "bob", "carol"] {
        voter(&net, label).submit(2, 7, net.now()).await.unwrap();
    }
    voter(&net, "dave").submit(1, 3, net.now()).await.unwrap();

    let reader = net.client(Address::from_label("reader"));
    assert_eq!(reader.battle_info().await.unwrap().total_votes, 4);

    let ended = end_and_reveal(&net, &mut worker).await;
    assert_eq!(ended, 1);
    assert_eq!(worker.state().battles_ended, 1);

    let entry = reader.battle_history(1).await.unwrap();
    assert_eq!(entry.total_participants, 4);
    assert_eq!(
        entry.outcome(),
        HistoryOutcome::Decided(Winner {
            template_id: 2,
            caption_id: 7,
            votes: 3,
        })
    );
}

#[tokio::test]
async fn test_zero_vote_battle_reveals_without_winner() {
    let net = devnet();
    let mut worker = operator(&net);

    end_and_reveal(&net, &mut worker).await;

    let reader = net.client(Address::from_label("reader"));
    let entry = reader.battle_history(1).await.unwrap();
    assert!(entry.revealed);
    assert_eq!(entry.total_participants, 0);
    assert_eq!(entry.outcome(), HistoryOutcome::NoVotes);
}

#[tokio::test]
async fn test_entry_pending_until_oracle_answers() {
    let net = devnet();
    let mut worker = operator(&net);
    voter(&net, "alice").submit(0, 1, net.now()).await.unwrap();

    net.advance_time(DURATION);
    worker.tick(net.now()).await.unwrap();

    let reader = net.client(Address::from_label("reader"));
    let entry = reader.battle_history(1).await.unwrap();
    assert_eq!(entry.outcome(), HistoryOutcome::PendingReveal);
    assert_eq!(entry.total_participants, 1);

    net.fulfill_decryptions();
    let entry = reader.battle_history(1).await.unwrap();
    assert!(matches!(entry.outcome(), HistoryOutcome::Decided(w) if w.template_id == 0 && w.caption_id == 1));
}

// =============================================================================
// VOTING RULES
// =============================================================================

#[tokio::test]
async fn test_second_vote_rejected() {
    let net = devnet();
    let alice = voter(&net, "alice");
    alice.submit(1, 1, net.now()).await.unwrap();

    let err = alice.submit(3, 4, net.now()).await.unwrap_err();
    assert!(matches!(err, VoteError::AlreadyVoted(1)));

    // a raw ballot skipping the client-side check is refused by the contract
    let client = net.client(Address::from_label("alice"));
    let contract = net.contract_address();
    let sender = client.sender();
    let gateway = net.gateway();
    let call = ContractCall::SubmitVote {
        template: gateway.encrypt(0, FheType::Uint8, contract, sender).await.unwrap(),
        caption: gateway.encrypt(0, FheType::Uint16, contract, sender).await.unwrap(),
    };
    let err = client.write(call).await.unwrap_err();
    assert_eq!(err, ClientError::Reverted(RevertKind::AlreadyVoted));
    assert_eq!(client.battle_info().await.unwrap().total_votes, 1);
}

#[tokio::test]
async fn test_vote_after_expiry_rejected() {
    let net = devnet();
    net.advance_time(DURATION);
    let err = voter(&net, "alice").submit(0, 0, net.now()).await.unwrap_err();
    assert!(matches!(err, VoteError::BattleNotActive));
}

#[tokio::test]
async fn test_votes_reset_for_next_battle() {
    let net = devnet();
    let mut worker = operator(&net);
    let alice = voter(&net, "alice");
    alice.submit(1, 2, net.now()).await.unwrap();

    end_and_reveal(&net, &mut worker).await;

    let snapshot = fetch_snapshot(alice.client()).await.unwrap();
    assert_eq!(snapshot.info.battle_number, 2);
    assert_eq!(snapshot.info.total_votes, 0);
    assert!(snapshot.info.active);
    assert!(!snapshot.has_voted);
    assert_eq!(snapshot.completed_battles, 1);

    alice.submit(4, 9, net.now()).await.unwrap();
    assert!(fetch_snapshot(alice.client()).await.unwrap().has_voted);
}

// =============================================================================
// HISTORY
// =============================================================================

#[tokio::test]
async fn test_history_tracks_every_battle() {
    let net = devnet();
    let mut worker = operator(&net);
    let reader = net.client(Address::from_label("reader"));

    let voters_per_battle = [2u64, 0, 3];
    for (round, &voters) in voters_per_battle.iter().enumerate() {
        for v in 0..voters {
            voter(&net, &format!("voter-{round}-{v}")).submit(0, 0, net.now()).await.unwrap();
        }
        end_and_reveal(&net, &mut worker).await;
        // let the cooldown lapse before the next battle expires
        net.advance_time(WorkerConfig::default().cooldown_secs);
    }

    let info = reader.battle_info().await.unwrap();
    let completed = reader.completed_battle_count().await.unwrap();
    assert_eq!(completed, 3);
    assert_eq!(info.battle_number, completed + 1);
    assert_eq!(reader.contract_info().await.unwrap().total_completed_battles, 3);

    let latest = reader.latest_completed_battle().await.unwrap().unwrap();
    assert_eq!(latest.battle_number, 3);

    let participants = reader.battle_participants(vec![1, 2, 3, 99]).await.unwrap();
    assert_eq!(participants, vec![2, 0, 3, 0]);
    net.inspect(|battle| assert_eq!(battle.state().battle_number - 1, battle.completed_battle_count()));
}

#[tokio::test]
async fn test_unknown_history_reverts() {
    let net = devnet();
    let reader = net.client(Address::from_label("reader"));
    assert!(reader.latest_completed_battle().await.unwrap().is_none());
    assert!(matches!(reader.battle_history(1).await, Err(ClientError::Reverted(_))));
}
