//! Property-Based Tests for the battle state machine
//!
//! Uses proptest to drive the contract with random voters, times and callers
//! and checks that the state machine's invariants hold.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use meme_battle::contract::prelude::*;
use meme_battle::fhe::{Address, DecryptionOracle, DecryptionRequest, FheType, MockCoprocessor};

const DURATION: u64 = 3600;
const T0: u64 = 1_700_000_000;
const TEMPLATES: u8 = 5;
const CAPTIONS: u16 = 10;

struct Harness {
    battle: EncryptedMemeBattle<MockCoprocessor>,
    cop: Arc<MockCoprocessor>,
    oracle: DecryptionOracle<MockCoprocessor>,
    operator: Address,
}

impl Harness {
    fn new(seed: u64) -> Self {
        let cop = Arc::new(MockCoprocessor::with_seed(seed));
        let operator = Address::from_label("operator");
        let oracle = Address::from_label("oracle");
        let params = DeployParams {
            template_count: TEMPLATES,
            caption_count: CAPTIONS,
            battle_duration: DURATION,
            operator,
            oracle,
        };
        let ctx = CallContext::new(Address::from_label("owner"), T0);
        let battle =
            EncryptedMemeBattle::deploy(params, &ctx, Address::from_label("battle"), cop.clone()).unwrap();
        Self {
            battle,
            oracle: DecryptionOracle::new(cop.clone(), oracle),
            cop,
            operator,
        }
    }

    fn vote(&mut self, voter: Address, template: u8, caption: u16, now: u64) -> BattleResult<Vec<BattleEvent>> {
        let contract = self.battle.address();
        let t = self.cop.encrypt_input(u64::from(template), FheType::Uint8, contract, voter).unwrap();
        let c = self.cop.encrypt_input(u64::from(caption), FheType::Uint16, contract, voter).unwrap();
        self.battle.submit_vote(&CallContext::new(voter, now), &t, &c)
    }

    fn end(&mut self, caller: Address, now: u64) -> BattleResult<Vec<BattleEvent>> {
        self.battle.end_battle(&CallContext::new(caller, now))
    }

    fn reveal(&mut self, events: &[BattleEvent], now: u64) -> Vec<BattleEvent> {
        let request = events
            .iter()
            .find_map(|e| match e {
                BattleEvent::DecryptionRequested { request, .. } => Some(request.clone()),
                _ => None,
            })
            .unwrap();
        self.deliver(&request, now)
    }

    fn deliver(&mut self, request: &DecryptionRequest, now: u64) -> Vec<BattleEvent> {
        let response = self.oracle.decrypt(request).unwrap();
        let ctx = CallContext::new(self.oracle.address(), now);
        self.battle
            .on_decrypted(&ctx, response.request_id, &response.plaintexts)
            .unwrap()
    }
}

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

/// Voter labels drawn from a small pool so duplicates are common
fn voters() -> impl Strategy<Value = Vec<(u8, u8, u16)>> {
    prop::collection::vec((0u8..12, 0..TEMPLATES, 0..CAPTIONS), 0..24)
}

fn label(id: u8) -> Address {
    Address::from_label(&format!("voter-{id}"))
}

// =============================================================================
// VOTING PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: total votes equals the number of distinct voters; repeats revert
    #[test]
    fn total_votes_counts_distinct_voters(ballots in voters(), seed in any::<u64>()) {
        let mut h = Harness::new(seed);
        let mut seen = BTreeSet::new();

        for (id, template, caption) in ballots {
            let result = h.vote(label(id), template, caption, T0 + 1);
            if seen.insert(id) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result.unwrap_err(), BattleError::AlreadyVoted);
            }
        }

        prop_assert_eq!(h.battle.battle_info().total_votes, seen.len() as u64);
    }

    /// Property: the revealed winner holds the plurality, lowest template on ties
    #[test]
    fn revealed_winner_is_plurality(ballots in voters(), seed in any::<u64>()) {
        let mut h = Harness::new(seed);
        let mut counts = [0u32; TEMPLATES as usize];
        let mut captions: Vec<BTreeSet<u16>> = vec![BTreeSet::new(); TEMPLATES as usize];

        for (id, template, caption) in ballots {
            if h.vote(label(id), template, caption, T0 + 1).is_ok() {
                counts[usize::from(template)] += 1;
                captions[usize::from(template)].insert(caption);
            }
        }

        let events = h.end(h.operator, T0 + DURATION).unwrap();
        h.reveal(&events, T0 + DURATION);
        let entry = h.battle.battle_history(1).unwrap().clone();

        let max = counts.iter().copied().max().unwrap_or(0);
        match entry.outcome() {
            HistoryOutcome::NoVotes => prop_assert_eq!(max, 0),
            HistoryOutcome::Decided(winner) => {
                let first_max = counts.iter().position(|&c| c == max).unwrap();
                prop_assert_eq!(usize::from(winner.template_id), first_max);
                prop_assert_eq!(winner.votes, max);
                // the caption comes from one of the winning template's voters
                prop_assert!(captions[first_max].contains(&winner.caption_id));
            }
            HistoryOutcome::PendingReveal => prop_assert!(false, "entry not revealed"),
        }
    }
}

// =============================================================================
// END-OF-BATTLE PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: nobody can end a battle before it expires
    #[test]
    fn end_fails_before_expiry(offset in 0..DURATION, caller in 0u8..3) {
        let mut h = Harness::new(1);
        let caller = match caller {
            0 => h.operator,
            1 => Address::from_label("owner"),
            _ => label(caller),
        };
        prop_assert!(h.end(caller, T0 + offset).is_err());
        prop_assert_eq!(h.battle.battle_info().battle_number, 1);
    }

    /// Property: only the operator can end an expired battle
    #[test]
    fn end_requires_operator(name in "[a-z]{1,12}", late in 0u64..100_000) {
        let mut h = Harness::new(2);
        let caller = Address::from_label(&name);
        prop_assume!(caller != h.operator);
        prop_assert_eq!(h.end(caller, T0 + DURATION + late).unwrap_err(), BattleError::NotAuthorized);
    }

    /// Property: each end advances the number, resets votes and appends history
    #[test]
    fn end_advances_battle(rounds in 1usize..6, votes_per_round in 0u8..4) {
        let mut h = Harness::new(3);
        let mut now = T0;

        for round in 0..rounds {
            for v in 0..votes_per_round {
                h.vote(label(v), v % TEMPLATES, u16::from(v), now + 1).unwrap();
            }
            now = h.battle.battle_info().ends_at;
            let before = h.battle.battle_info();
            let events = h.end(h.operator, now).unwrap();

            let after = h.battle.battle_info();
            prop_assert_eq!(after.battle_number, before.battle_number + 1);
            prop_assert_eq!(after.total_votes, 0);
            prop_assert!(after.active);
            prop_assert!(!h.battle.has_user_voted(&label(0)));

            let entry = h.battle.battle_history(before.battle_number).unwrap();
            prop_assert!(!entry.revealed);
            prop_assert_eq!(entry.total_participants, u64::from(votes_per_round));
            prop_assert_eq!(h.battle.completed_battle_count(), round as u64 + 1);
            prop_assert_eq!(h.battle.completed_battle_count(), after.battle_number - 1);

            h.reveal(&events, now);
        }
    }

    /// Property: a second callback never changes a revealed entry
    #[test]
    fn revealed_entries_are_immutable(template in 0..TEMPLATES, caption in 0..CAPTIONS) {
        let mut h = Harness::new(4);
        h.vote(label(0), template, caption, T0 + 1).unwrap();
        let events = h.end(h.operator, T0 + DURATION).unwrap();
        let request = events
            .iter()
            .find_map(|e| match e {
                BattleEvent::DecryptionRequested { request, .. } => Some(request.clone()),
                _ => None,
            })
            .unwrap();

        h.deliver(&request, T0 + DURATION);
        let revealed = h.battle.battle_history(1).unwrap().clone();

        let again = h.deliver(&request, T0 + DURATION + 5);
        prop_assert!(again.is_empty());
        prop_assert_eq!(h.battle.battle_history(1).unwrap(), &revealed);
        prop_assert_eq!(
            revealed.outcome(),
            HistoryOutcome::Decided(Winner { template_id: template, caption_id: caption, votes: 1 })
        );
    }
}
