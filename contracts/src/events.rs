//! Contract events

use battle_fhe::{Address, DecryptionRequest};
use serde::{Deserialize, Serialize};

use crate::types::Winner;

/// Logs emitted by successful calls. None of them carry plaintext choices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    VoteSubmitted {
        voter: Address,
        timestamp: u64,
    },
    BattleEnded {
        battle_number: u64,
        timestamp: u64,
    },
    BattleStarted {
        battle_number: u64,
        timestamp: u64,
        ends_at: u64,
    },
    /// Tallies of `battle_number` handed to the decryption oracle
    DecryptionRequested {
        battle_number: u64,
        request: DecryptionRequest,
    },
    BattleResultsRevealed {
        battle_number: u64,
        winner: Option<Winner>,
    },
    OperatorChanged {
        previous: Address,
        operator: Address,
    },
    DurationChanged {
        previous: u64,
        duration: u64,
    },
}

impl BattleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BattleEvent::VoteSubmitted { .. } => "VoteSubmitted",
            BattleEvent::BattleEnded { .. } => "BattleEnded",
            BattleEvent::BattleStarted { .. } => "BattleStarted",
            BattleEvent::DecryptionRequested { .. } => "DecryptionRequested",
            BattleEvent::BattleResultsRevealed { .. } => "BattleResultsRevealed",
            BattleEvent::OperatorChanged { .. } => "OperatorChanged",
            BattleEvent::DurationChanged { .. } => "DurationChanged",
        }
    }
}
