//! The chain client seam
//!
//! [`ChainClient`] is the only thing the worker, the vote submitter and the
//! CLI know about the chain. [`BattleReads`] layers typed reads on top and
//! rejects results of the wrong shape at the boundary.

use std::sync::Arc;

use async_trait::async_trait;
use battle_contract::{BattleHistoryEntry, BattleInfo, ContractCall, ContractInfo, ViewCall, ViewResult};
use battle_fhe::Address;

use crate::errors::{ClientError, ClientResult};
use crate::types::{Receipt, TxHash};

/// Read, write and receipt access to one battle contract
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Execute a view call
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult>;

    /// Sign and broadcast a transaction; returns once the node accepted it
    async fn write(&self, call: ContractCall) -> ClientResult<TxHash>;

    /// Receipt of a mined transaction, `None` while pending
    async fn receipt(&self, hash: TxHash) -> ClientResult<Option<Receipt>>;

    /// Address transactions are signed with
    fn sender(&self) -> Address;

    /// Address of the battle contract
    fn contract_address(&self) -> Address;
}

#[async_trait]
impl<C: ChainClient + ?Sized> ChainClient for Arc<C> {
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
        (**self).read(call).await
    }

    async fn write(&self, call: ContractCall) -> ClientResult<TxHash> {
        (**self).write(call).await
    }

    async fn receipt(&self, hash: TxHash) -> ClientResult<Option<Receipt>> {
        (**self).receipt(hash).await
    }

    fn sender(&self) -> Address {
        (**self).sender()
    }

    fn contract_address(&self) -> Address {
        (**self).contract_address()
    }
}

fn unexpected(call: &ViewCall, got: &ViewResult) -> ClientError {
    ClientError::InvalidResponse(format!("{} returned {got:?}", call.name()))
}

/// Typed views over any [`ChainClient`]
#[async_trait]
pub trait BattleReads: ChainClient {
    async fn battle_info(&self) -> ClientResult<BattleInfo> {
        let call = ViewCall::BattleInfo;
        match self.read(call.clone()).await? {
            ViewResult::BattleInfo(info) => Ok(info),
            other => Err(unexpected(&call, &other)),
        }
    }

    async fn contract_info(&self) -> ClientResult<ContractInfo> {
        let call = ViewCall::ContractInfo;
        match self.read(call.clone()).await? {
            ViewResult::ContractInfo(info) => Ok(info),
            other => Err(unexpected(&call, &other)),
        }
    }

    async fn has_user_voted(&self, user: Address) -> ClientResult<bool> {
        let call = ViewCall::HasUserVoted(user);
        match self.read(call.clone()).await? {
            ViewResult::Bool(voted) => Ok(voted),
            other => Err(unexpected(&call, &other)),
        }
    }

    async fn battle_history(&self, battle_number: u64) -> ClientResult<BattleHistoryEntry> {
        let call = ViewCall::BattleHistory(battle_number);
        match self.read(call.clone()).await? {
            ViewResult::History(entry) if entry.battle_number == battle_number => Ok(entry),
            other => Err(unexpected(&call, &other)),
        }
    }

    async fn completed_battle_count(&self) -> ClientResult<u64> {
        let call = ViewCall::CompletedBattleCount;
        match self.read(call.clone()).await? {
            ViewResult::Count(count) => Ok(count),
            other => Err(unexpected(&call, &other)),
        }
    }

    /// Latest completed battle, `None` before the first battle ended
    async fn latest_completed_battle(&self) -> ClientResult<Option<BattleHistoryEntry>> {
        if self.completed_battle_count().await? == 0 {
            return Ok(None);
        }
        let call = ViewCall::LatestCompletedBattle;
        match self.read(call.clone()).await? {
            ViewResult::History(entry) => Ok(Some(entry)),
            other => Err(unexpected(&call, &other)),
        }
    }

    async fn battle_participants(&self, battle_numbers: Vec<u64>) -> ClientResult<Vec<u64>> {
        let expected = battle_numbers.len();
        let call = ViewCall::BattleParticipantsBatch(battle_numbers);
        match self.read(call.clone()).await? {
            ViewResult::Counts(counts) if counts.len() == expected => Ok(counts),
            other => Err(unexpected(&call, &other)),
        }
    }
}

impl<C: ChainClient + ?Sized> BattleReads for C {}
