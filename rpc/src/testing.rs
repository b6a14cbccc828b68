//! Scripted in-memory client for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use battle_contract::{BattleInfo, ContractCall, ViewCall, ViewResult};
use battle_fhe::Address;
use parking_lot::Mutex;

use crate::client::ChainClient;
use crate::errors::{ClientError, ClientResult};
use crate::types::{Receipt, TxHash, TxStatus};

pub(crate) struct ScriptedClient {
    pub info: Mutex<BattleInfo>,
    pub voted: AtomicBool,
    /// Upcoming reads that fail with a network error
    pub read_failures: AtomicU32,
    /// Delay applied to successive `BattleInfo` reads
    pub info_delays: Mutex<VecDeque<Duration>>,
    pub info_reads: AtomicU64,
    pub reads: AtomicU32,
    pub writes: Mutex<Vec<ContractCall>>,
    pub write_error: Mutex<Option<ClientError>>,
    pub hang_writes: AtomicBool,
    pub receipts: Mutex<VecDeque<ClientResult<Option<Receipt>>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            info: Mutex::new(BattleInfo {
                active: true,
                ends_at: 1_000,
                template_count: 5,
                caption_count: 10,
                total_votes: 0,
                battle_number: 1,
            }),
            voted: AtomicBool::new(false),
            read_failures: AtomicU32::new(0),
            info_delays: Mutex::new(VecDeque::new()),
            info_reads: AtomicU64::new(0),
            reads: AtomicU32::new(0),
            writes: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
            hang_writes: AtomicBool::new(false),
            receipts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_receipt(&self, receipt: ClientResult<Option<Receipt>>) {
        self.receipts.lock().push_back(receipt);
    }
}

pub(crate) fn receipt(hash: TxHash, status: TxStatus) -> Receipt {
    Receipt {
        hash,
        status,
        block_number: Some(1),
        reason: None,
        events: Vec::new(),
    }
}

#[async_trait]
impl ChainClient for ScriptedClient {
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ClientError::Network("connection reset".into()));
        }
        match call {
            ViewCall::BattleInfo => {
                let n = self.info_reads.fetch_add(1, Ordering::SeqCst) + 1;
                let delay = self.info_delays.lock().pop_front();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let mut info = self.info.lock().clone();
                info.battle_number = info.battle_number.max(n);
                Ok(ViewResult::BattleInfo(info))
            }
            ViewCall::HasUserVoted(_) => Ok(ViewResult::Bool(self.voted.load(Ordering::SeqCst))),
            ViewCall::CompletedBattleCount => Ok(ViewResult::Count(0)),
            other => Err(ClientError::InvalidResponse(format!("unscripted {}", other.name()))),
        }
    }

    async fn write(&self, call: ContractCall) -> ClientResult<TxHash> {
        if self.hang_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.write_error.lock().take() {
            return Err(err);
        }
        let mut writes = self.writes.lock();
        writes.push(call);
        Ok(TxHash([writes.len() as u8; 32]))
    }

    async fn receipt(&self, _hash: TxHash) -> ClientResult<Option<Receipt>> {
        self.receipts.lock().pop_front().unwrap_or(Ok(None))
    }

    fn sender(&self) -> Address {
        Address::from_label("scripted-sender")
    }

    fn contract_address(&self) -> Address {
        Address::from_label("scripted-contract")
    }
}
