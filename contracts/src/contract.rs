//! The battle contract
//!
//! [`EncryptedMemeBattle`] owns the storage and exposes the guarded entry
//! points. Every entry point re-validates its full precondition set against
//! the call context; nothing derived in an earlier call is trusted. All
//! ciphertext work of a call is done before storage is touched, so a failed
//! call leaves the state root unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use battle_fhe::{Address, Coprocessor, DecryptionRequest, EncryptedInput, FheType, Handle};
use tracing::{debug, info};

use crate::calls::{CallContext, ContractCall, ViewCall, ViewResult};
use crate::constants::{
    MAX_BATTLE_DURATION, MAX_CAPTIONS, MAX_TEMPLATES, MIN_BATTLE_DURATION, MIN_CAPTIONS,
    MIN_TEMPLATES,
};
use crate::errors::BattleError;
use crate::events::BattleEvent;
use crate::state::{BattleState, EncryptedTally};
use crate::tally::compute_winner;
use crate::types::{BattleHistoryEntry, BattleInfo, ContractInfo, Vote};
use crate::BattleResult;

/// Constructor arguments
#[derive(Clone, Debug)]
pub struct DeployParams {
    pub template_count: u8,
    pub caption_count: u16,
    /// Seconds per battle
    pub battle_duration: u64,
    pub operator: Address,
    pub oracle: Address,
}

impl DeployParams {
    fn validate(&self) -> BattleResult<()> {
        if !(MIN_TEMPLATES..=MAX_TEMPLATES).contains(&self.template_count) {
            return Err(BattleError::InvalidTemplateCount(self.template_count));
        }
        if !(MIN_CAPTIONS..=MAX_CAPTIONS).contains(&self.caption_count) {
            return Err(BattleError::InvalidCaptionCount(self.caption_count));
        }
        check_duration(self.battle_duration)?;
        if self.operator.is_zero() {
            return Err(BattleError::InvalidOperator);
        }
        Ok(())
    }
}

fn check_duration(seconds: u64) -> BattleResult<()> {
    if !(MIN_BATTLE_DURATION..=MAX_BATTLE_DURATION).contains(&seconds) {
        return Err(BattleError::InvalidDuration(seconds));
    }
    Ok(())
}

/// A deployed battle contract
pub struct EncryptedMemeBattle<P: Coprocessor> {
    /// Contract address, part of every input proof
    address: Address,
    state: BattleState,
    coprocessor: Arc<P>,
}

impl<P: Coprocessor> EncryptedMemeBattle<P> {
    /// Deploy; the deployer becomes owner and battle #1 starts at once
    pub fn deploy(
        params: DeployParams,
        ctx: &CallContext,
        address: Address,
        coprocessor: Arc<P>,
    ) -> BattleResult<Self> {
        params.validate()?;
        let tally = EncryptedTally::fresh(coprocessor.as_ref(), params.template_count)?;

        let state = BattleState {
            owner: ctx.caller,
            operator: params.operator,
            oracle: params.oracle,
            template_count: params.template_count,
            caption_count: params.caption_count,
            battle_duration: params.battle_duration,
            battle_number: 1,
            active: true,
            ends_at: ctx.timestamp + params.battle_duration,
            total_votes: 0,
            votes: HashMap::new(),
            tally,
            history: Vec::new(),
            requests: HashMap::new(),
            next_request_id: 1,
        };

        info!(
            contract = %address,
            owner = %ctx.caller,
            operator = %params.operator,
            ends_at = state.ends_at,
            "Battle contract deployed"
        );

        Ok(Self { address, state, coprocessor })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn state_root(&self) -> [u8; 32] {
        self.state.state_root()
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Validate a call against current state without executing it
    pub fn preflight(&self, ctx: &CallContext, call: &ContractCall) -> BattleResult<()> {
        match call {
            ContractCall::SubmitVote { template, caption } => {
                self.check_vote(ctx)?;
                self.verify_ballot(ctx, template, caption)?;
                Ok(())
            }
            ContractCall::EndBattle => self.check_end(ctx),
            ContractCall::SetBattleOperator(operator) => {
                self.only_owner(ctx)?;
                if operator.is_zero() {
                    return Err(BattleError::InvalidOperator);
                }
                Ok(())
            }
            ContractCall::SetBattleDuration(seconds) => {
                self.only_owner(ctx)?;
                check_duration(*seconds)
            }
        }
    }

    /// Execute a state-changing call
    pub fn execute(&mut self, ctx: &CallContext, call: &ContractCall) -> BattleResult<Vec<BattleEvent>> {
        match call {
            ContractCall::SubmitVote { template, caption } => self.submit_vote(ctx, template, caption),
            ContractCall::EndBattle => self.end_battle(ctx),
            ContractCall::SetBattleOperator(operator) => self.set_battle_operator(ctx, *operator),
            ContractCall::SetBattleDuration(seconds) => self.set_battle_duration(ctx, *seconds),
        }
    }

    /// Answer a read-only call
    pub fn view(&self, call: &ViewCall) -> BattleResult<ViewResult> {
        Ok(match call {
            ViewCall::BattleInfo => ViewResult::BattleInfo(self.battle_info()),
            ViewCall::ContractInfo => ViewResult::ContractInfo(self.contract_info()),
            ViewCall::HasUserVoted(user) => ViewResult::Bool(self.has_user_voted(user)),
            ViewCall::BattleHistory(n) => ViewResult::History(self.battle_history(*n)?.clone()),
            ViewCall::CompletedBattleCount => ViewResult::Count(self.completed_battle_count()),
            ViewCall::LatestCompletedBattle => ViewResult::History(self.latest_completed_battle()?.clone()),
            ViewCall::BattleParticipants(n) => ViewResult::Count(self.battle_participants(*n)?),
            ViewCall::BattleParticipantsBatch(ns) => ViewResult::Counts(self.battle_participants_batch(ns)),
        })
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Cast one encrypted ballot for the current battle
    pub fn submit_vote(
        &mut self,
        ctx: &CallContext,
        template: &EncryptedInput,
        caption: &EncryptedInput,
    ) -> BattleResult<Vec<BattleEvent>> {
        self.check_vote(ctx)?;
        let (template, caption) = self.verify_ballot(ctx, template, caption)?;
        let tally = self.fold_ballot(&template, &caption)?;

        self.state.tally = tally;
        self.state.votes.insert(
            ctx.caller,
            Vote {
                template,
                caption,
                submitted_at: ctx.timestamp,
            },
        );
        self.state.total_votes += 1;

        debug!(
            battle = self.state.battle_number,
            voter = %ctx.caller,
            total_votes = self.state.total_votes,
            "Vote recorded"
        );

        Ok(vec![BattleEvent::VoteSubmitted {
            voter: ctx.caller,
            timestamp: ctx.timestamp,
        }])
    }

    /// Close an expired battle, request its decryption and start the next one
    pub fn end_battle(&mut self, ctx: &CallContext) -> BattleResult<Vec<BattleEvent>> {
        self.check_end(ctx)?;
        let fresh = EncryptedTally::fresh(self.coprocessor.as_ref(), self.state.template_count)?;

        let ended = self.state.battle_number;
        let request = DecryptionRequest {
            request_id: self.state.next_request_id,
            handles: self.state.tally.reveal_handles(),
        };

        self.state.history.push(BattleHistoryEntry::ended(
            ended,
            ctx.timestamp,
            self.state.total_votes,
        ));
        self.state.requests.insert(request.request_id, ended);
        self.state.next_request_id += 1;

        self.state.votes.clear();
        self.state.tally = fresh;
        self.state.total_votes = 0;
        self.state.battle_number += 1;
        self.state.ends_at = ctx.timestamp + self.state.battle_duration;

        info!(
            ended,
            participants = self.state.history.last().map_or(0, |e| e.total_participants),
            next = self.state.battle_number,
            ends_at = self.state.ends_at,
            request_id = request.request_id,
            "Battle ended"
        );

        Ok(vec![
            BattleEvent::BattleEnded {
                battle_number: ended,
                timestamp: ctx.timestamp,
            },
            BattleEvent::DecryptionRequested {
                battle_number: ended,
                request,
            },
            BattleEvent::BattleStarted {
                battle_number: self.state.battle_number,
                timestamp: ctx.timestamp,
                ends_at: self.state.ends_at,
            },
        ])
    }

    /// Oracle callback with plaintexts in request order. Repeated callbacks
    /// for an already revealed battle change nothing.
    pub fn on_decrypted(
        &mut self,
        ctx: &CallContext,
        request_id: u64,
        plaintexts: &[u64],
    ) -> BattleResult<Vec<BattleEvent>> {
        if ctx.caller != self.state.oracle {
            return Err(BattleError::NotAuthorized);
        }
        let Some(&battle_number) = self.state.requests.get(&request_id) else {
            // issued ids leave the map once revealed
            if (1..self.state.next_request_id).contains(&request_id) {
                debug!(request_id, "Request already fulfilled, ignoring callback");
                return Ok(Vec::new());
            }
            return Err(BattleError::UnknownDecryptionRequest(request_id));
        };

        let template_count = usize::from(self.state.template_count);
        let caption_count = self.state.caption_count;
        let entry = self
            .state
            .history_entry_mut(battle_number)
            .ok_or(BattleError::HistoryNotFound(battle_number))?;

        if entry.revealed {
            debug!(battle_number, request_id, "Battle already revealed, ignoring callback");
            return Ok(Vec::new());
        }

        let expected = template_count * 2;
        if plaintexts.len() != expected {
            return Err(BattleError::InvalidDecryption {
                expected,
                got: plaintexts.len(),
            });
        }

        let (tallies, captions) = plaintexts.split_at(template_count);
        let winner = compute_winner(tallies, captions, caption_count);
        entry.revealed = true;
        entry.winner = winner;
        self.state.requests.remove(&request_id);

        info!(battle_number, ?winner, "Battle results revealed");

        Ok(vec![BattleEvent::BattleResultsRevealed { battle_number, winner }])
    }

    /// Owner-only operator rotation
    pub fn set_battle_operator(&mut self, ctx: &CallContext, operator: Address) -> BattleResult<Vec<BattleEvent>> {
        self.only_owner(ctx)?;
        if operator.is_zero() {
            return Err(BattleError::InvalidOperator);
        }
        let previous = std::mem::replace(&mut self.state.operator, operator);
        info!(%previous, %operator, "Battle operator changed");
        Ok(vec![BattleEvent::OperatorChanged { previous, operator }])
    }

    /// Owner-only; applies from the next battle on
    pub fn set_battle_duration(&mut self, ctx: &CallContext, seconds: u64) -> BattleResult<Vec<BattleEvent>> {
        self.only_owner(ctx)?;
        check_duration(seconds)?;
        let previous = std::mem::replace(&mut self.state.battle_duration, seconds);
        info!(previous, duration = seconds, "Battle duration changed");
        Ok(vec![BattleEvent::DurationChanged { previous, duration: seconds }])
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub fn battle_info(&self) -> BattleInfo {
        self.state.battle_info()
    }

    pub fn contract_info(&self) -> ContractInfo {
        ContractInfo {
            max_templates: MAX_TEMPLATES,
            max_captions: MAX_CAPTIONS,
            current_templates: self.state.template_count,
            current_captions: self.state.caption_count,
            battle_duration_seconds: self.state.battle_duration,
            total_completed_battles: self.completed_battle_count(),
            owner: self.state.owner,
            operator: self.state.operator,
        }
    }

    /// Ballot present for `user` in the current battle
    pub fn has_user_voted(&self, user: &Address) -> bool {
        self.state.has_voted(user)
    }

    pub fn battle_history(&self, battle_number: u64) -> BattleResult<&BattleHistoryEntry> {
        self.state
            .history_entry(battle_number)
            .ok_or(BattleError::HistoryNotFound(battle_number))
    }

    pub fn completed_battle_count(&self) -> u64 {
        self.state.history.len() as u64
    }

    pub fn latest_completed_battle(&self) -> BattleResult<&BattleHistoryEntry> {
        self.state.history.last().ok_or(BattleError::HistoryNotFound(0))
    }

    pub fn battle_participants(&self, battle_number: u64) -> BattleResult<u64> {
        self.battle_history(battle_number).map(|e| e.total_participants)
    }

    /// Participant counts; unknown battles read as zero
    pub fn battle_participants_batch(&self, battle_numbers: &[u64]) -> Vec<u64> {
        battle_numbers
            .iter()
            .map(|n| self.battle_participants(*n).unwrap_or(0))
            .collect()
    }

    // ------------------------------------------------------------------
    // Guards and ciphertext work
    // ------------------------------------------------------------------

    fn only_owner(&self, ctx: &CallContext) -> BattleResult<()> {
        if ctx.caller != self.state.owner {
            return Err(BattleError::NotAuthorized);
        }
        Ok(())
    }

    fn check_vote(&self, ctx: &CallContext) -> BattleResult<()> {
        if !self.state.battle_info().accepts_votes(ctx.timestamp) {
            return Err(BattleError::BattleNotActive);
        }
        if self.state.has_voted(&ctx.caller) {
            return Err(BattleError::AlreadyVoted);
        }
        Ok(())
    }

    fn check_end(&self, ctx: &CallContext) -> BattleResult<()> {
        if ctx.caller != self.state.operator {
            return Err(BattleError::NotAuthorized);
        }
        if !self.state.active {
            return Err(BattleError::BattleNotActive);
        }
        if ctx.timestamp < self.state.ends_at {
            return Err(BattleError::BattleStillActive);
        }
        Ok(())
    }

    fn verify_ballot(
        &self,
        ctx: &CallContext,
        template: &EncryptedInput,
        caption: &EncryptedInput,
    ) -> BattleResult<(Handle, Handle)> {
        let cop = self.coprocessor.as_ref();
        let template = cop.verify_input(template, FheType::Uint8, self.address, ctx.caller)?;
        let caption = cop.verify_input(caption, FheType::Uint16, self.address, ctx.caller)?;
        Ok((template, caption))
    }

    /// Fold one ballot into a copy of the tallies.
    ///
    /// For each template `t`: count the vote if the choice equals `t`, and
    /// take the caption into `t`'s slot when the slot is empty or a coin
    /// flip says so.
    fn fold_ballot(&self, template: &Handle, caption: &Handle) -> BattleResult<EncryptedTally> {
        let cop = self.coprocessor.as_ref();
        let one = cop.trivial_encrypt(1, FheType::Uint32)?;
        let zero = cop.trivial_encrypt(0, FheType::Uint32)?;

        let mut next = self.state.tally.clone();
        for t in 0..usize::from(self.state.template_count) {
            let is_t = cop.eq_scalar(template, t as u64)?;
            let increment = cop.select(&is_t, &one, &zero)?;
            next.tallies[t] = cop.add(&next.tallies[t], &increment)?;

            let empty = cop.not(&next.filled[t])?;
            let coin = cop.random_bool()?;
            let replace = cop.and(&is_t, &cop.or(&empty, &coin)?)?;
            next.captions[t] = cop.select(&replace, caption, &next.captions[t])?;
            next.filled[t] = cop.or(&next.filled[t], &is_t)?;
        }
        Ok(next)
    }
}
