//! Worker error types

use battle_client::ClientError;
use battle_fhe::Address;
use thiserror::Error;

/// Conditions that stop the worker
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Signer is not the on-chain operator
    #[error("Signer {signer} is not the battle operator (operator is {operator})")]
    NotOperator { operator: Address, signer: Address },

    /// The contract rejected `endBattle` for this signer
    #[error("Not authorized to end battle #{battle_number}")]
    Unauthorized { battle_number: u64 },

    #[error("Invalid worker config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl WorkerError {
    /// Fatal errors halt the worker for good; the process should exit non-zero
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::NotOperator { .. } | WorkerError::Unauthorized { .. })
    }
}

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;
