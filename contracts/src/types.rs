//! Records exposed by the battle contract read surface

use battle_fhe::{Address, Handle};
use serde::{Deserialize, Serialize};

/// Current battle, as returned by `getBattleInfo`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleInfo {
    /// True while voting is open (stays true across battles)
    pub active: bool,
    /// Unix timestamp after which the battle may be ended
    pub ends_at: u64,
    pub template_count: u8,
    pub caption_count: u16,
    /// Distinct voters in this battle
    pub total_votes: u64,
    pub battle_number: u64,
}

impl BattleInfo {
    /// Expired is derived, never stored: `now >= ends_at`
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.ends_at
    }

    /// Voting is open for a call executed at `now`
    pub fn accepts_votes(&self, now: u64) -> bool {
        self.active && now < self.ends_at
    }

    /// Seconds left before expiry (zero once expired)
    pub fn seconds_left(&self, now: u64) -> u64 {
        self.ends_at.saturating_sub(now)
    }
}

/// Contract configuration, as returned by `getContractInfo`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub max_templates: u8,
    pub max_captions: u16,
    pub current_templates: u8,
    pub current_captions: u16,
    pub battle_duration_seconds: u64,
    pub total_completed_battles: u64,
    pub owner: Address,
    pub operator: Address,
}

/// Decrypted result of a battle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub template_id: u8,
    pub caption_id: u16,
    pub votes: u32,
}

/// What a reader can conclude from a history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// Decryption has not come back yet; winner fields are undefined
    PendingReveal,
    /// Revealed, but nobody voted
    NoVotes,
    Decided(Winner),
}

/// Immutable record of one completed battle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleHistoryEntry {
    pub battle_number: u64,
    pub end_timestamp: u64,
    pub total_participants: u64,
    pub revealed: bool,
    /// Only meaningful once `revealed`; `None` for a battle without votes
    pub winner: Option<Winner>,
}

impl BattleHistoryEntry {
    /// Fresh, unrevealed entry written when a battle ends
    pub fn ended(battle_number: u64, end_timestamp: u64, total_participants: u64) -> Self {
        Self {
            battle_number,
            end_timestamp,
            total_participants,
            revealed: false,
            winner: None,
        }
    }

    pub fn outcome(&self) -> HistoryOutcome {
        match (self.revealed, self.winner) {
            (false, _) => HistoryOutcome::PendingReveal,
            (true, None) => HistoryOutcome::NoVotes,
            (true, Some(winner)) => HistoryOutcome::Decided(winner),
        }
    }

    /// Rebuild from the flat wire tuple. Unrevealed entries drop whatever
    /// the winner fields hold; `winner_votes == 0` is the no-vote sentinel.
    pub fn from_wire(
        revealed: bool,
        winner_template_id: u8,
        winner_caption_id: u16,
        winner_votes: u32,
        battle_number: u64,
        end_timestamp: u64,
        total_participants: u64,
    ) -> Self {
        let winner = (revealed && winner_votes > 0).then_some(Winner {
            template_id: winner_template_id,
            caption_id: winner_caption_id,
            votes: winner_votes,
        });
        Self {
            battle_number,
            end_timestamp,
            total_participants,
            revealed,
            winner,
        }
    }

    /// Flat wire tuple `(templateId, captionId, votes)`, zeros when undefined
    pub fn winner_fields(&self) -> (u8, u16, u32) {
        self.winner
            .map(|w| (w.template_id, w.caption_id, w.votes))
            .unwrap_or((0, 0, 0))
    }
}

/// One voter's encrypted ballot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub template: Handle,
    pub caption: Handle,
    pub submitted_at: u64,
}
