//! Battle contract storage
//!
//! All storage of one deployed battle contract: configuration, the current
//! battle with its encrypted tallies, and the append-only history ledger.
//! Vote choices and tallies are handles; nothing here is plaintext except
//! counts of voters and the revealed results.

use std::collections::HashMap;

use battle_fhe::{Address, Coprocessor, FheType, Handle};
use serde::{Deserialize, Serialize};

use crate::errors::BattleError;
use crate::types::{BattleHistoryEntry, BattleInfo, Vote};

/// Encrypted per-template accumulators of the current battle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTally {
    /// Vote counter per template (euint32)
    pub tallies: Vec<Handle>,
    /// Caption sampled from the template's voters (euint16)
    pub captions: Vec<Handle>,
    /// Whether the template has been voted for at all (ebool)
    pub filled: Vec<Handle>,
}

impl EncryptedTally {
    /// Zeroed accumulators for `template_count` templates
    pub fn fresh<P: Coprocessor + ?Sized>(
        coprocessor: &P,
        template_count: u8,
    ) -> Result<Self, BattleError> {
        let n = usize::from(template_count);
        let mut tally = Self {
            tallies: Vec::with_capacity(n),
            captions: Vec::with_capacity(n),
            filled: Vec::with_capacity(n),
        };
        for _ in 0..n {
            tally.tallies.push(coprocessor.trivial_encrypt(0, FheType::Uint32)?);
            tally.captions.push(coprocessor.trivial_encrypt(0, FheType::Uint16)?);
            tally.filled.push(coprocessor.trivial_encrypt(0, FheType::Bool)?);
        }
        Ok(tally)
    }

    /// Handles to decrypt when the battle ends: tallies then caption picks
    pub fn reveal_handles(&self) -> Vec<Handle> {
        self.tallies.iter().chain(self.captions.iter()).copied().collect()
    }
}

/// Complete contract storage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleState {
    pub owner: Address,
    pub operator: Address,
    /// Only address allowed to deliver decryption callbacks
    pub oracle: Address,
    pub template_count: u8,
    pub caption_count: u16,
    /// Duration applied to the next battle that starts
    pub battle_duration: u64,

    pub battle_number: u64,
    pub active: bool,
    pub ends_at: u64,
    pub total_votes: u64,
    pub(crate) votes: HashMap<Address, Vote>,
    pub(crate) tally: EncryptedTally,

    pub(crate) history: Vec<BattleHistoryEntry>,
    /// Decryption request id -> battle number
    pub(crate) requests: HashMap<u64, u64>,
    pub(crate) next_request_id: u64,
}

impl BattleState {
    pub fn battle_info(&self) -> BattleInfo {
        BattleInfo {
            active: self.active,
            ends_at: self.ends_at,
            template_count: self.template_count,
            caption_count: self.caption_count,
            total_votes: self.total_votes,
            battle_number: self.battle_number,
        }
    }

    /// Whether `voter` has a ballot in the current battle
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn history(&self) -> &[BattleHistoryEntry] {
        &self.history
    }

    /// History entry of a completed battle (battle numbers start at 1)
    pub fn history_entry(&self, battle_number: u64) -> Option<&BattleHistoryEntry> {
        let index = usize::try_from(battle_number.checked_sub(1)?).ok()?;
        self.history.get(index)
    }

    pub(crate) fn history_entry_mut(&mut self, battle_number: u64) -> Option<&mut BattleHistoryEntry> {
        let index = usize::try_from(battle_number.checked_sub(1)?).ok()?;
        self.history.get_mut(index)
    }

    /// Commitment to the full storage, independent of map iteration order
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.owner.as_bytes());
        hasher.update(self.operator.as_bytes());
        hasher.update(self.oracle.as_bytes());
        hasher.update(&[self.template_count]);
        hasher.update(&self.caption_count.to_le_bytes());
        hasher.update(&self.battle_duration.to_le_bytes());
        hasher.update(&self.battle_number.to_le_bytes());
        hasher.update(&[u8::from(self.active)]);
        hasher.update(&self.ends_at.to_le_bytes());
        hasher.update(&self.total_votes.to_le_bytes());

        let mut voters: Vec<_> = self.votes.iter().collect();
        voters.sort_by_key(|(addr, _)| **addr);
        for (addr, vote) in voters {
            hasher.update(addr.as_bytes());
            hasher.update(vote.template.as_bytes());
            hasher.update(vote.caption.as_bytes());
            hasher.update(&vote.submitted_at.to_le_bytes());
        }

        for handle in self.tally.reveal_handles().iter().chain(self.tally.filled.iter()) {
            hasher.update(handle.as_bytes());
        }

        for entry in &self.history {
            let (t, c, v) = entry.winner_fields();
            hasher.update(&entry.battle_number.to_le_bytes());
            hasher.update(&entry.end_timestamp.to_le_bytes());
            hasher.update(&entry.total_participants.to_le_bytes());
            hasher.update(&[u8::from(entry.revealed), t]);
            hasher.update(&c.to_le_bytes());
            hasher.update(&v.to_le_bytes());
        }

        let mut requests: Vec<_> = self.requests.iter().collect();
        requests.sort();
        for (id, battle) in requests {
            hasher.update(&id.to_le_bytes());
            hasher.update(&battle.to_le_bytes());
        }
        hasher.update(&self.next_request_id.to_le_bytes());

        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_fhe::{Decryptor, MockCoprocessor};

    #[test]
    fn test_fresh_tally_is_zero() {
        let cop = MockCoprocessor::with_seed(1);
        let tally = EncryptedTally::fresh(&cop, 3).unwrap();
        assert_eq!(tally.tallies.len(), 3);
        assert_eq!(tally.reveal_handles().len(), 6);
        for handle in tally.reveal_handles() {
            assert_eq!(cop.decrypt(&handle).unwrap(), 0);
        }
    }
}
