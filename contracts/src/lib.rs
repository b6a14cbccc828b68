//! Meme Battle Contract
//!
//! Recurring, time-boxed battles in which users vote for a meme template and
//! a caption. Choices stay encrypted end to end: the contract only ever
//! folds ciphertext handles into per-template accumulators, and plaintext
//! appears once, when the decryption oracle reveals the tallies of a
//! finished battle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Battle Lifecycle                     │
//! ├─────────────────────────────────────────────────────┤
//! │  submitVote (encrypted template + caption)          │
//! │      ↓   homomorphic fold into EncryptedTally       │
//! │  endBattle (operator, after ends_at)                │
//! │      ↓   history entry + DecryptionRequested        │
//! │  next battle starts immediately                     │
//! │      ↓                                              │
//! │  onDecrypted (oracle) -> winner in history          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **One ballot per address per battle**, replaced wholesale at rollover
//! - **Atomic calls**: every failure leaves storage untouched
//! - **Idempotent reveal**: repeated oracle callbacks are no-ops
//! - **Plurality winner** with ties broken toward the lowest template id

pub mod calls;
pub mod constants;
pub mod contract;
pub mod errors;
pub mod events;
pub mod state;
pub mod tally;
pub mod types;

pub use calls::{CallContext, ContractCall, ViewCall, ViewResult};
pub use contract::{DeployParams, EncryptedMemeBattle};
pub use errors::BattleError;
pub use events::BattleEvent;
pub use state::{BattleState, EncryptedTally};
pub use tally::compute_winner;
pub use types::{BattleHistoryEntry, BattleInfo, ContractInfo, HistoryOutcome, Vote, Winner};

/// Result type for contract calls
pub type BattleResult<T> = Result<T, BattleError>;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calls::{CallContext, ContractCall, ViewCall, ViewResult};
    pub use crate::contract::{DeployParams, EncryptedMemeBattle};
    pub use crate::errors::BattleError;
    pub use crate::events::BattleEvent;
    pub use crate::types::{BattleHistoryEntry, BattleInfo, ContractInfo, HistoryOutcome, Winner};
    pub use crate::BattleResult;
}
