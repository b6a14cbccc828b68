//! Meme Battle: encrypted voting rounds
//!
//! Root crate. Re-exports the workspace crates for integration testing and
//! provides an in-process devnet that runs the whole lifecycle locally.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  encrypt   ┌─────────────────────┐
//! │    Voter     │ ─────────> │  EncryptionGateway  │
//! └──────┬───────┘            └─────────────────────┘
//!        │ submitVote(handles, proofs)
//!        ▼
//! ┌──────────────────────────┐  endBattle  ┌──────────────────┐
//! │   EncryptedMemeBattle    │ <────────── │  OperatorWorker  │
//! │  encrypted tallies       │             └──────────────────┘
//! └──────┬───────────────────┘
//!        │ DecryptionRequested
//!        ▼
//! ┌──────────────────────────┐  callback (plaintext tallies)
//! │    DecryptionOracle      │ ──────────> winner in history
//! └──────────────────────────┘
//! ```
//!
//! ## Crate Organization
//!
//! - `battle-fhe`: coprocessor interface, mock coprocessor, gateway, oracle
//! - `battle-contract`: the battle state machine and winner selection
//! - `battle-client`: chain client trait, EVM backend, vote submission, feed
//! - `battle-worker`: operator loop that ends expired battles exactly once
//! - `battle-cli`: the `meme-battle` binary

pub mod devnet;

pub use battle_client as client;
pub use battle_contract as contract;
pub use battle_fhe as fhe;
pub use battle_worker as worker;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::devnet::{DevnetAccounts, DevnetClient, DevnetConfig, LocalDevnet};
    pub use battle_client::{BattleReads, ChainClient, ClientError, Receipt, RevertKind, TimedClient, TxHash};
    pub use battle_contract::prelude::*;
    pub use battle_fhe::{Address, EncryptedInput, EncryptionGateway, FheType, MockCoprocessor};
    pub use battle_worker::{OperatorWorker, TickOutcome, WorkerConfig};
}
