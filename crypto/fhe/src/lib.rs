//! Meme Battle FHE surface
//!
//! Everything the battle contract needs from a fully-homomorphic backend,
//! expressed over opaque ciphertext handles.
//!
//! # Key Features:
//! - Encrypted inputs bound to a `(contract, user)` pair by a proof
//! - Homomorphic add / equality / boolean logic / select on handles
//! - Encrypted random bits for caption sampling
//! - Asynchronous decryption oracle answering contract requests
//!
//! # Architecture:
//! - [`EncryptionGateway`]: client side, plaintext choice -> input + proof
//! - [`Coprocessor`]: contract side, operations on handles
//! - [`DecryptionOracle`]: key holder, handles -> plaintexts for callbacks
//!
//! [`MockCoprocessor`] implements both the coprocessor and the key side
//! in-process for devnets and tests.

pub mod coprocessor;
pub mod errors;
pub mod gateway;
pub mod oracle;
pub mod types;

pub use coprocessor::{Coprocessor, Decryptor, MockCoprocessor};
pub use errors::FheError;
pub use gateway::{EncryptionGateway, LocalGateway};
pub use oracle::{DecryptionOracle, DecryptionRequest, DecryptionResponse};
pub use types::{Address, EncryptedInput, FheType, Handle};

/// Result type for FHE operations
pub type FheResult<T> = Result<T, FheError>;
