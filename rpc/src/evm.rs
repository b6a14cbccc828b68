//! EVM chain client
//!
//! Talks to the deployed battle contract over JSON-RPC with `ethers`. Reads
//! go through a plain provider; writes through a `SignerMiddleware` built
//! from the configured private key. Without a key the client is read-only.

use std::sync::Arc;

use async_trait::async_trait;
use battle_contract::{BattleHistoryEntry, BattleInfo, ContractCall, ContractInfo, ViewCall, ViewResult};
use battle_fhe::Address;
use ethers::contract::{abigen, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Bytes, H160, H256, U256, U64};
use ethers::utils::id;
use tracing::{debug, info};

use crate::client::ChainClient;
use crate::errors::{ClientError, ClientResult, RevertKind};
use crate::types::{Receipt, TxHash, TxStatus};

abigen!(
    MemeBattleContract,
    r#"[
        function submitVote(bytes32 encryptedTemplate, bytes templateProof, bytes32 encryptedCaption, bytes captionProof)
        function endBattle()
        function setBattleOperator(address newOperator)
        function setBattleDuration(uint256 newDuration)
        function getBattleInfo() view returns (bool, uint256, uint8, uint16, uint256, uint256)
        function getContractInfo() view returns (uint8, uint16, uint8, uint16, uint256, uint256, address, address)
        function hasUserVoted(address user) view returns (bool)
        function getBattleHistory(uint256 battleNumber) view returns (bool, uint8, uint16, uint32, uint256, uint256, uint256)
        function getCompletedBattleCount() view returns (uint256)
        function getLatestCompletedBattle() view returns (bool, uint8, uint16, uint32, uint256, uint256, uint256)
        function getBattleParticipants(uint256 battleNumber) view returns (uint256)
        function getBattleParticipantsBatch(uint256[] battleNumbers) view returns (uint256[])
    ]"#
);

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

type HistoryTuple = (bool, u8, u16, u32, U256, U256, U256);

/// Network hints for chains with an FHE coprocessor
pub fn is_fhe_network(chain_id: u64) -> bool {
    matches!(chain_id, 8009 | 11155111 | 31337)
}

/// `ethers` implementation of [`ChainClient`]
pub struct EvmChainClient {
    provider: Provider<Http>,
    reader: MemeBattleContract<Provider<Http>>,
    writer: Option<MemeBattleContract<SignerClient>>,
    sender: Address,
    contract: Address,
}

impl EvmChainClient {
    /// Connect to `rpc_url`. With a private key the client can also write.
    pub async fn connect(rpc_url: &str, contract: Address, private_key: Option<&str>) -> ClientResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| ClientError::Config(format!("rpc provider error: {e}")))?;
        let contract_h160 = to_h160(contract);
        let reader = MemeBattleContract::new(contract_h160, Arc::new(provider.clone()));

        let (writer, sender) = match private_key {
            Some(key) => {
                let chain_id = provider
                    .get_chainid()
                    .await
                    .map_err(|e| ClientError::Network(format!("chain id error: {e}")))?;
                let wallet = key
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .map_err(|e| ClientError::Config(format!("invalid private key: {e}")))?
                    .with_chain_id(chain_id.as_u64());
                let sender = from_h160(wallet.address());
                let signer = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
                (Some(MemeBattleContract::new(contract_h160, signer)), sender)
            }
            None => (None, Address::ZERO),
        };

        info!(%contract, %sender, read_only = writer.is_none(), "Connected to chain");
        Ok(Self { provider, reader, writer, sender, contract })
    }

    pub fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }

    /// Balance of `address` in wei
    pub async fn balance(&self, address: Address) -> ClientResult<U256> {
        self.provider
            .get_balance(to_h160(address), None)
            .await
            .map_err(|e| ClientError::from_message(&e.to_string()))
    }

    pub async fn chain_id(&self) -> ClientResult<u64> {
        let chain = self
            .provider
            .get_chainid()
            .await
            .map_err(|e| ClientError::from_message(&e.to_string()))?;
        u64::try_from(chain).map_err(|_| ClientError::InvalidResponse(format!("chain id {chain} out of range")))
    }

    /// Whether bytecode is deployed at the contract address
    pub async fn is_deployed(&self) -> ClientResult<bool> {
        let code = self
            .provider
            .get_code(to_h160(self.contract), None)
            .await
            .map_err(|e| ClientError::from_message(&e.to_string()))?;
        Ok(!code.as_ref().is_empty())
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn read(&self, call: ViewCall) -> ClientResult<ViewResult> {
        let c = &self.reader;
        let result = match &call {
            ViewCall::BattleInfo => {
                let (active, ends_at, template_count, caption_count, total_votes, battle_number) =
                    c.get_battle_info().call().await.map_err(classify)?;
                ViewResult::BattleInfo(BattleInfo {
                    active,
                    ends_at: to_u64(ends_at, "endsAt")?,
                    template_count,
                    caption_count,
                    total_votes: to_u64(total_votes, "totalVotes")?,
                    battle_number: to_u64(battle_number, "battleNumber")?,
                })
            }
            ViewCall::ContractInfo => {
                let (max_t, max_c, cur_t, cur_c, duration, completed, owner, operator) =
                    c.get_contract_info().call().await.map_err(classify)?;
                ViewResult::ContractInfo(ContractInfo {
                    max_templates: max_t,
                    max_captions: max_c,
                    current_templates: cur_t,
                    current_captions: cur_c,
                    battle_duration_seconds: to_u64(duration, "battleDurationSeconds")?,
                    total_completed_battles: to_u64(completed, "totalCompletedBattles")?,
                    owner: from_h160(owner),
                    operator: from_h160(operator),
                })
            }
            ViewCall::HasUserVoted(user) => {
                ViewResult::Bool(c.has_user_voted(to_h160(*user)).call().await.map_err(classify)?)
            }
            ViewCall::BattleHistory(n) => {
                let raw = c.get_battle_history(U256::from(*n)).call().await.map_err(classify)?;
                ViewResult::History(history_entry(raw)?)
            }
            ViewCall::CompletedBattleCount => {
                let count = c.get_completed_battle_count().call().await.map_err(classify)?;
                ViewResult::Count(to_u64(count, "completedBattleCount")?)
            }
            ViewCall::LatestCompletedBattle => {
                let raw = c.get_latest_completed_battle().call().await.map_err(classify)?;
                ViewResult::History(history_entry(raw)?)
            }
            ViewCall::BattleParticipants(n) => {
                let count = c.get_battle_participants(U256::from(*n)).call().await.map_err(classify)?;
                ViewResult::Count(to_u64(count, "participants")?)
            }
            ViewCall::BattleParticipantsBatch(ns) => {
                let ns: Vec<U256> = ns.iter().map(|n| U256::from(*n)).collect();
                let counts = c.get_battle_participants_batch(ns).call().await.map_err(classify)?;
                ViewResult::Counts(
                    counts
                        .into_iter()
                        .map(|v| to_u64(v, "participants"))
                        .collect::<ClientResult<_>>()?,
                )
            }
        };
        debug!(call = call.name(), "Read completed");
        Ok(result)
    }

    async fn write(&self, call: ContractCall) -> ClientResult<TxHash> {
        let c = self.writer.as_ref().ok_or(ClientError::ReadOnly)?;
        let tx = match call {
            ContractCall::SubmitVote { template, caption } => c.submit_vote(
                template.handle.0,
                Bytes::from(template.proof),
                caption.handle.0,
                Bytes::from(caption.proof),
            ),
            ContractCall::EndBattle => c.end_battle(),
            ContractCall::SetBattleOperator(operator) => c.set_battle_operator(to_h160(operator)),
            ContractCall::SetBattleDuration(seconds) => c.set_battle_duration(U256::from(seconds)),
        };
        let pending = tx.send().await.map_err(classify)?;
        Ok(TxHash(pending.tx_hash().0))
    }

    async fn receipt(&self, hash: TxHash) -> ClientResult<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(H256::from(hash.0))
            .await
            .map_err(|e| ClientError::from_message(&e.to_string()))?;

        Ok(receipt.map(|r| Receipt {
            hash,
            status: if r.status == Some(U64::from(1)) {
                TxStatus::Success
            } else {
                TxStatus::Failed
            },
            block_number: r.block_number.map(|b| b.as_u64()),
            reason: None,
            events: Vec::new(),
        }))
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn contract_address(&self) -> Address {
        self.contract
    }
}

fn to_h160(address: Address) -> H160 {
    H160::from(address.0)
}

fn from_h160(address: H160) -> Address {
    Address::from(address.0)
}

fn to_u64(value: U256, field: &str) -> ClientResult<u64> {
    u64::try_from(value).map_err(|_| ClientError::InvalidResponse(format!("{field} does not fit in u64: {value}")))
}

fn history_entry(raw: HistoryTuple) -> ClientResult<BattleHistoryEntry> {
    let (revealed, template, caption, votes, number, ended, participants) = raw;
    Ok(BattleHistoryEntry::from_wire(
        revealed,
        template,
        caption,
        votes,
        to_u64(number, "battleNumber")?,
        to_u64(ended, "endTimestamp")?,
        to_u64(participants, "totalParticipants")?,
    ))
}

/// Match revert data against the contract's custom error selectors
pub fn revert_from_data(data: &[u8]) -> Option<RevertKind> {
    let selector = data.get(..4)?;
    RevertKind::KNOWN
        .into_iter()
        .find(|kind| id(kind.signature()) == selector)
}

fn classify<M: Middleware>(err: ContractError<M>) -> ClientError {
    if let Some(kind) = err.as_revert().and_then(|data| revert_from_data(data.as_ref())) {
        return ClientError::Reverted(kind);
    }
    if let Some(reason) = err.decode_revert::<String>() {
        return ClientError::Reverted(RevertKind::from_message(&reason));
    }
    ClientError::from_message(&err.to_string())
}
