//! In-process battle devnet
//!
//! A single-contract ledger with the mock coprocessor behind it. It stands
//! in for a node, the FHE coprocessor and the decryption oracle so the full
//! lifecycle runs in tests and benches without a network.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       LocalDevnet                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DevnetClient (per sender)                                   │
//! │      │ write: preflight like gas estimation, then enqueue    │
//! │      ▼                                                       │
//! │  ┌──────────────┐   mine()    ┌──────────────────────┐       │
//! │  │ pending FIFO │ ──────────> │ EncryptedMemeBattle  │       │
//! │  └──────────────┘             └──────────┬───────────┘       │
//! │                                          │ DecryptionRequested│
//! │                               ┌──────────▼───────────┐       │
//! │  fulfill_decryptions() ─────> │  DecryptionOracle    │       │
//! │                               └──────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calls are serialized by one mutex, and transactions execute in the order
//! they were accepted. Time only moves when the test moves it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use battle_client::{ChainClient, ClientError, ClientResult, Receipt, RevertKind, TxHash, TxStatus};
use battle_contract::{
    BattleError, BattleEvent, BattleResult, CallContext, ContractCall, DeployParams, EncryptedMemeBattle,
    ViewCall, ViewResult,
};
use battle_fhe::{Address, DecryptionOracle, DecryptionRequest, LocalGateway, MockCoprocessor};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Devnet genesis parameters
#[derive(Clone, Debug)]
pub struct DevnetConfig {
    pub template_count: u8,
    pub caption_count: u16,
    pub battle_duration: u64,
    /// Ledger clock at deployment
    pub genesis_time: u64,
    /// Mine every accepted transaction immediately
    pub auto_mine: bool,
    /// Seed for the coprocessor's random bits
    pub seed: u64,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            template_count: 5,
            caption_count: 10,
            battle_duration: 3600,
            genesis_time: 1_700_000_000,
            auto_mine: false,
            seed: 7,
        }
    }
}

/// Well-known devnet accounts
#[derive(Clone, Copy, Debug)]
pub struct DevnetAccounts {
    pub owner: Address,
    pub operator: Address,
    pub oracle: Address,
}

impl Default for DevnetAccounts {
    fn default() -> Self {
        Self {
            owner: Address::from_label("devnet-owner"),
            operator: Address::from_label("devnet-operator"),
            oracle: Address::from_label("devnet-oracle"),
        }
    }
}

struct PendingTx {
    hash: TxHash,
    sender: Address,
    call: ContractCall,
}

struct Ledger {
    contract: EncryptedMemeBattle<MockCoprocessor>,
    timestamp: u64,
    block_number: u64,
    pending: VecDeque<PendingTx>,
    receipts: HashMap<TxHash, Receipt>,
    nonces: HashMap<Address, u64>,
    decryptions: VecDeque<DecryptionRequest>,
    read_faults: u32,
    auto_mine: bool,
}

impl Ledger {
    fn mine(&mut self) -> Vec<Receipt> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        self.block_number += 1;
        let mut mined = Vec::with_capacity(self.pending.len());

        while let Some(tx) = self.pending.pop_front() {
            let ctx = CallContext::new(tx.sender, self.timestamp);
            let receipt = match self.contract.execute(&ctx, &tx.call) {
                Ok(events) => {
                    for event in &events {
                        if let BattleEvent::DecryptionRequested { request, .. } = event {
                            self.decryptions.push_back(request.clone());
                        }
                    }
                    Receipt {
                        hash: tx.hash,
                        status: TxStatus::Success,
                        block_number: Some(self.block_number),
                        reason: None,
                        events,
                    }
                }
                Err(err) => {
                    debug!(hash = %tx.hash, call = tx.call.name(), error = %err, "Transaction reverted");
                    Receipt {
                        hash: tx.hash,
                        status: TxStatus::Failed,
                        block_number: Some(self.block_number),
                        reason: Some(err.revert_name().to_string()),
                        events: Vec::new(),
                    }
                }
            };
            self.receipts.insert(tx.hash, receipt.clone());
            mined.push(receipt);
        }

        debug!(block = self.block_number, txs = mined.len(), "Block mined");
        mined
    }
}

/// Single-contract in-process chain
pub struct LocalDevnet {
    ledger: Mutex<Ledger>,
    coprocessor: Arc<MockCoprocessor>,
    oracle: DecryptionOracle<MockCoprocessor>,
    accounts: DevnetAccounts,
    contract_address: Address,
}

impl LocalDevnet {
    /// Deploy the battle contract at genesis
    pub fn start(config: DevnetConfig, accounts: DevnetAccounts) -> BattleResult<Arc<Self>> {
        let coprocessor = Arc::new(MockCoprocessor::with_seed(config.seed));
        let contract_address = Address::from_label("devnet-battle");
        let params = DeployParams {
            template_count: config.template_count,
            caption_count: config.caption_count,
            battle_duration: config.battle_duration,
            operator: accounts.operator,
            oracle: accounts.oracle,
        };
        let ctx = CallContext::new(accounts.owner, config.genesis_time);
        let contract = EncryptedMemeBattle::deploy(params, &ctx, contract_address, coprocessor.clone())?;

        info!(
            contract = %contract_address,
            templates = config.template_count,
            duration = config.battle_duration,
            "Devnet started"
        );

        Ok(Arc::new(Self {
            ledger: Mutex::new(Ledger {
                contract,
                timestamp: config.genesis_time,
                block_number: 0,
                pending: VecDeque::new(),
                receipts: HashMap::new(),
                nonces: HashMap::new(),
                decryptions: VecDeque::new(),
                read_faults: 0,
                auto_mine: config.auto_mine,
            }),
            oracle: DecryptionOracle::new(coprocessor.clone(), accounts.oracle),
            coprocessor,
            accounts,
            contract_address,
        }))
    }

    /// Client signing as `sender`
    pub fn client(self: &Arc<Self>, sender: Address) -> DevnetClient {
        DevnetClient {
            devnet: self.clone(),
            sender,
        }
    }

    /// Encryption gateway bound to this devnet's coprocessor
    pub fn gateway(&self) -> LocalGateway {
        LocalGateway::new(self.coprocessor.clone())
    }

    pub fn coprocessor(&self) -> Arc<MockCoprocessor> {
        self.coprocessor.clone()
    }

    pub fn accounts(&self) -> DevnetAccounts {
        self.accounts
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    /// Ledger clock
    pub fn now(&self) -> u64 {
        self.ledger.lock().timestamp
    }

    pub fn advance_time(&self, seconds: u64) {
        let mut ledger = self.ledger.lock();
        ledger.timestamp += seconds;
        debug!(now = ledger.timestamp, "Devnet clock advanced");
    }

    pub fn set_auto_mine(&self, enabled: bool) {
        self.ledger.lock().auto_mine = enabled;
    }

    /// Execute every pending transaction, oldest first, in one block
    pub fn mine(&self) -> Vec<Receipt> {
        self.ledger.lock().mine()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.lock().pending.len()
    }

    /// Make the next `count` reads fail with a transport error
    pub fn inject_read_faults(&self, count: u32) {
        self.ledger.lock().read_faults = count;
    }

    /// Answer every queued decryption request through the oracle callback.
    /// Returns the number of callbacks delivered.
    pub fn fulfill_decryptions(&self) -> usize {
        let mut ledger = self.ledger.lock();
        let mut delivered = 0;
        while let Some(request) = ledger.decryptions.pop_front() {
            let response = match self.oracle.decrypt(&request) {
                Ok(response) => response,
                Err(err) => {
                    warn!(request_id = request.request_id, error = %err, "Decryption failed");
                    continue;
                }
            };
            let ctx = CallContext::new(self.oracle.address(), ledger.timestamp);
            match ledger
                .contract
                .on_decrypted(&ctx, response.request_id, &response.plaintexts)
            {
                Ok(_) => delivered += 1,
                Err(err) => warn!(request_id = request.request_id, error = %err, "Callback rejected"),
            }
        }
        delivered
    }

    /// Direct read access to the contract
    pub fn inspect<R>(&self, f: impl FnOnce(&EncryptedMemeBattle<MockCoprocessor>) -> R) -> R {
        f(&self.ledger.lock().contract)
    }

    fn submit(&self, sender: Address, call: ContractCall) -> ClientResult<TxHash> {
        let mut ledger = self.ledger.lock();
        let ctx = CallContext::new(sender, ledger.timestamp);
        ledger.contract.preflight(&ctx, &call).map_err(revert)?;

        let nonce = ledger.nonces.entry(sender).or_insert(0);
        let hash = tx_hash(sender, *nonce, &call);
        *nonce += 1;

        debug!(%sender, call = call.name(), %hash, "Transaction accepted");
        ledger.pending.push_back(PendingTx { hash, sender, call });
        if ledger.auto_mine {
            ledger.mine();
        }
        Ok(hash)
    }
}

fn revert(err: BattleError) -> ClientError {
    ClientError::Reverted(RevertKind::from(&err))
}

fn tx_hash(sender: Address, nonce: u64, call: &ContractCall) -> TxHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(sender.as_bytes());
    hasher.update(&nonce.to_le_bytes());
    hasher.update(call.name().as_bytes());
    TxHash(*hasher.finalize().as_bytes())
}

/// [`ChainClient`] for one devnet account
#[derive(Clone)]
pub struct DevnetClient {
    devnet: Arc<LocalDevnet>,
    sender: Address,
}

impl DevnetClient {
    pub fn devnet(&self) -> &Arc<LocalDevnet> {
        &self.devnet
    }
}

#[async_trait]
impl ChainClient for DevnetClient {
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
        let mut ledger = self.devnet.ledger.lock();
        if ledger.read_faults > 0 {
            ledger.read_faults -= 1;
            return Err(ClientError::Network("devnet: injected read fault".into()));
        }
        ledger.contract.view(&call).map_err(revert)
    }

    async fn write(&self, call: ContractCall) -> ClientResult<TxHash> {
        self.devnet.submit(self.sender, call)
    }

    async fn receipt(&self, hash: TxHash) -> ClientResult<Option<Receipt>> {
        Ok(self.devnet.ledger.lock().receipts.get(&hash).cloned())
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn contract_address(&self) -> Address {
        self.devnet.contract_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_client::BattleReads;

    fn devnet() -> Arc<LocalDevnet> {
        LocalDevnet::start(DevnetConfig::default(), DevnetAccounts::default()).unwrap()
    }

    #[tokio::test]
    async fn test_write_preflights_like_gas_estimation() {
        let net = devnet();
        let operator = net.client(net.accounts().operator);

        let err = operator.write(ContractCall::EndBattle).await.unwrap_err();
        assert_eq!(err, ClientError::Reverted(RevertKind::BattleStillActive));
        assert_eq!(net.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_receipt_absent_until_mined() {
        let net = devnet();
        net.advance_time(3600);
        let operator = net.client(net.accounts().operator);

        let hash = operator.write(ContractCall::EndBattle).await.unwrap();
        assert_eq!(operator.receipt(hash).await.unwrap(), None);

        let mined = net.mine();
        assert_eq!(mined.len(), 1);
        assert!(operator.receipt(hash).await.unwrap().unwrap().succeeded());
        assert_eq!(operator.battle_info().await.unwrap().battle_number, 2);
    }

    #[tokio::test]
    async fn test_second_queued_end_reverts_in_block() {
        let net = devnet();
        net.advance_time(3600);
        let operator = net.client(net.accounts().operator);

        let first = operator.write(ContractCall::EndBattle).await.unwrap();
        let second = operator.write(ContractCall::EndBattle).await.unwrap();
        assert_ne!(first, second);

        let mined = net.mine();
        assert!(mined[0].succeeded());
        assert_eq!(mined[1].status, TxStatus::Failed);
        assert_eq!(mined[1].reason.as_deref(), Some("BattleStillActive"));
    }

    #[tokio::test]
    async fn test_read_faults() {
        let net = devnet();
        net.inject_read_faults(1);
        let client = net.client(Address::from_label("reader"));
        assert!(client.battle_info().await.unwrap_err().is_transient());
        assert!(client.battle_info().await.is_ok());
    }

    #[tokio::test]
    async fn test_fulfill_decryptions_reveals_history() {
        let net = devnet();
        net.set_auto_mine(true);
        net.advance_time(3600);
        let operator = net.client(net.accounts().operator);
        operator.write(ContractCall::EndBattle).await.unwrap();

        assert_eq!(net.fulfill_decryptions(), 1);
        assert_eq!(net.fulfill_decryptions(), 0);
        let entry = operator.battle_history(1).await.unwrap();
        assert!(entry.revealed);
        assert!(entry.winner.is_none());
    }
}
