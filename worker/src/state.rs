//! Process-local worker bookkeeping
//!
//! Nothing here is persisted. A restarted worker starts from
//! [`WorkerState::default`] and re-derives everything from chain reads.

use battle_client::TxHash;

/// An `endBattle` transaction the worker broadcast and has not resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub hash: TxHash,
    pub battle_number: u64,
    pub submitted_at: u64,
}

/// A battle this worker considers ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Processed {
    pub battle_number: u64,
    pub marked_at: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerState {
    pub in_flight: Option<InFlight>,
    pub last_processed: Option<Processed>,
    /// No chain reads before this time
    pub cooldown_until: Option<u64>,
    /// Confirmed `endBattle` transactions sent by this worker
    pub battles_ended: u64,
}

impl WorkerState {
    pub fn mark_processed(&mut self, battle_number: u64, now: u64) {
        self.last_processed = Some(Processed {
            battle_number,
            marked_at: now,
        });
    }

    /// `battle_number` was marked processed less than `ttl` seconds ago
    pub fn is_processed(&self, battle_number: u64, now: u64, ttl: u64) -> bool {
        self.last_processed.is_some_and(|p| {
            p.battle_number == battle_number && now.saturating_sub(p.marked_at) < ttl
        })
    }

    pub fn in_cooldown(&self, now: u64) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processed_marker_expires() {
        let mut state = WorkerState::default();
        state.mark_processed(5, 100);
        assert!(state.is_processed(5, 150, 300));
        assert!(!state.is_processed(4, 150, 300));
        assert!(!state.is_processed(5, 400, 300));
    }

    #[test]
    fn test_cooldown_window() {
        let state = WorkerState {
            cooldown_until: Some(130),
            ..Default::default()
        };
        assert!(state.in_cooldown(129));
        assert!(!state.in_cooldown(130));
        assert!(!WorkerState::default().in_cooldown(0));
    }
}
