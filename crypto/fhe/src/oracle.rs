//! Asynchronous decryption oracle
//!
//! A contract fires a [`DecryptionRequest`] and forgets about it. Some time
//! later the oracle decrypts the listed handles and calls back into the
//! contract with the plaintexts, in request order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coprocessor::Decryptor;
use crate::types::{Address, Handle};
use crate::FheResult;

/// Handles a contract wants decrypted, keyed by a contract-issued id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub request_id: u64,
    pub handles: Vec<Handle>,
}

/// Plaintexts for one request, same order as the request's handles
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub request_id: u64,
    pub plaintexts: Vec<u64>,
}

/// Key holder that answers decryption requests
pub struct DecryptionOracle<D: Decryptor> {
    decryptor: Arc<D>,
    /// Address the oracle signs its callbacks with
    address: Address,
}

impl<D: Decryptor> DecryptionOracle<D> {
    pub fn new(decryptor: Arc<D>, address: Address) -> Self {
        Self { decryptor, address }
    }

    /// Callback sender address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Decrypt every handle of a request
    pub fn decrypt(&self, request: &DecryptionRequest) -> FheResult<DecryptionResponse> {
        let plaintexts = request
            .handles
            .iter()
            .map(|h| self.decryptor.decrypt(h))
            .collect::<FheResult<Vec<_>>>()?;

        debug!(request_id = request.request_id, count = plaintexts.len(), "Decrypted request");

        Ok(DecryptionResponse {
            request_id: request.request_id,
            plaintexts,
        })
    }
}
