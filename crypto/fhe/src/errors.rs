//! FHE Error types

use thiserror::Error;

use crate::types::FheType;

/// Errors that can occur while encrypting, operating on or decrypting handles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FheError {
    /// Handle is not known to the coprocessor
    #[error("Unknown ciphertext handle: {0}")]
    UnknownHandle(String),

    /// Input proof does not bind the ciphertext to this contract and user
    #[error("Invalid input proof: {0}")]
    InvalidProof(String),

    /// Operand types do not line up for the requested operation
    #[error("Type mismatch: expected {expected:?}, got {got:?}")]
    TypeMismatch { expected: FheType, got: FheType },

    /// Plaintext does not fit the requested encrypted type
    #[error("Value {value} does not fit in {ty:?}")]
    ValueOutOfRange { value: u64, ty: FheType },

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Malformed address string
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
