//! Typed contract calls
//!
//! Every entry point and view of the battle contract as a plain value, so
//! that chain clients can route them without loosely-typed payloads.

use battle_fhe::{Address, EncryptedInput};
use serde::{Deserialize, Serialize};

use crate::types::{BattleHistoryEntry, BattleInfo, ContractInfo};

/// Who is calling and when the ledger executes the call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// Block timestamp (seconds)
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// State-changing entry points
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCall {
    SubmitVote {
        template: EncryptedInput,
        caption: EncryptedInput,
    },
    EndBattle,
    SetBattleOperator(Address),
    SetBattleDuration(u64),
}

impl ContractCall {
    /// ABI function name
    pub fn name(&self) -> &'static str {
        match self {
            ContractCall::SubmitVote { .. } => "submitVote",
            ContractCall::EndBattle => "endBattle",
            ContractCall::SetBattleOperator(_) => "setBattleOperator",
            ContractCall::SetBattleDuration(_) => "setBattleDuration",
        }
    }
}

/// Read-only calls
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewCall {
    BattleInfo,
    ContractInfo,
    HasUserVoted(Address),
    BattleHistory(u64),
    CompletedBattleCount,
    LatestCompletedBattle,
    BattleParticipants(u64),
    BattleParticipantsBatch(Vec<u64>),
}

impl ViewCall {
    pub fn name(&self) -> &'static str {
        match self {
            ViewCall::BattleInfo => "getBattleInfo",
            ViewCall::ContractInfo => "getContractInfo",
            ViewCall::HasUserVoted(_) => "hasUserVoted",
            ViewCall::BattleHistory(_) => "getBattleHistory",
            ViewCall::CompletedBattleCount => "getCompletedBattleCount",
            ViewCall::LatestCompletedBattle => "getLatestCompletedBattle",
            ViewCall::BattleParticipants(_) => "getBattleParticipants",
            ViewCall::BattleParticipantsBatch(_) => "getBattleParticipantsBatch",
        }
    }
}

/// Result of a [`ViewCall`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewResult {
    BattleInfo(BattleInfo),
    ContractInfo(ContractInfo),
    Bool(bool),
    History(BattleHistoryEntry),
    Count(u64),
    Counts(Vec<u64>),
}
