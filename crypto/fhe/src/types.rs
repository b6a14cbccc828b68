//! Handles, addresses and encrypted input payloads
//!
//! A ciphertext never travels by value: contracts and clients pass 32-byte
//! handles that the coprocessor resolves. Addresses are 20-byte account
//! identifiers, the same width as on an EVM chain.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::FheError;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Check for the null address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Deterministic address derived from a label (devnet accounts, tests)
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = FheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(hex_str)
            .map_err(|e| FheError::InvalidAddress(format!("{trimmed}: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| FheError::InvalidAddress(format!("{trimmed}: expected 20 bytes")))?;
        Ok(Address(bytes))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

/// Opaque reference to a ciphertext held by the coprocessor
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(pub [u8; 32]);

impl Handle {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl From<[u8; 32]> for Handle {
    fn from(bytes: [u8; 32]) -> Self {
        Handle(bytes)
    }
}

/// Encrypted value types supported by the coprocessor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
}

impl FheType {
    /// Bit width of the plaintext domain
    pub fn bits(&self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
        }
    }

    /// Largest representable plaintext
    pub fn max_value(&self) -> u64 {
        (1u64 << self.bits()) - 1
    }

    /// Reduce a plaintext into this type's domain (wrapping arithmetic)
    pub fn wrap(&self, value: u64) -> u64 {
        value & self.max_value()
    }

    /// Stable one-byte tag mixed into handle and proof derivation
    pub fn tag(&self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint16 => 3,
            FheType::Uint32 => 4,
        }
    }
}

/// Ciphertext handle plus the proof that it was formed for a (contract, user) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handle: Handle,
    pub proof: Vec<u8>,
}

impl EncryptedInput {
    pub fn new(handle: Handle, proof: Vec<u8>) -> Self {
        Self { handle, proof }
    }
}
