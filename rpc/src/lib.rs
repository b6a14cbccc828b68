//! Meme Battle Chain Client
//!
//! Everything off-chain code uses to talk to the battle contract.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Battle Client                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
//! │  │ VoteSubmitter│  │  BattleFeed  │  │   Worker /   │       │
//! │  │              │  │  (watch)     │  │   CLI        │       │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘       │
//! │         └─────────────────┼─────────────────┘               │
//! │                  ┌────────▼────────┐                         │
//! │                  │   TimedClient   │  retries, timeouts      │
//! │                  └────────┬────────┘                         │
//! │                  ┌────────▼────────┐                         │
//! │                  │   ChainClient   │  EVM / local devnet     │
//! │                  └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Error classes
//!
//! - Contract reverts ([`RevertKind`]) are never retried
//! - Transport failures are retried on reads only
//! - Submission and confirmation timeouts are reported separately from
//!   on-chain reverts

pub mod client;
pub mod errors;
pub mod evm;
pub mod feed;
pub mod timed;
pub mod types;
pub mod vote;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{BattleReads, ChainClient};
pub use errors::{ClientError, ClientResult, RevertKind, Severity, TxStage};
pub use evm::EvmChainClient;
pub use feed::{fetch_snapshot, BattleFeed, BattleSnapshot};
pub use timed::{PendingTransaction, TimedClient, TimeoutConfig};
pub use types::{Receipt, TxHash, TxStatus};
pub use vote::{VoteError, VoteSubmitter};
