//! Client-side encryption of vote choices
//!
//! In production this is the vendor SDK running next to the wallet. The
//! core only needs: plaintext in, `(handle, proof)` out, bound to one
//! contract and one user.

use std::sync::Arc;

use async_trait::async_trait;

use crate::coprocessor::MockCoprocessor;
use crate::types::{Address, EncryptedInput, FheType};
use crate::FheResult;

/// Turns a plaintext selection into an encrypted input plus proof
#[async_trait]
pub trait EncryptionGateway: Send + Sync {
    async fn encrypt(
        &self,
        value: u64,
        ty: FheType,
        contract: Address,
        user: Address,
    ) -> FheResult<EncryptedInput>;
}

/// Gateway encrypting straight into a local [`MockCoprocessor`]
#[derive(Clone)]
pub struct LocalGateway {
    coprocessor: Arc<MockCoprocessor>,
}

impl LocalGateway {
    pub fn new(coprocessor: Arc<MockCoprocessor>) -> Self {
        Self { coprocessor }
    }
}

#[async_trait]
impl EncryptionGateway for LocalGateway {
    async fn encrypt(
        &self,
        value: u64,
        ty: FheType,
        contract: Address,
        user: Address,
    ) -> FheResult<EncryptedInput> {
        self.coprocessor.encrypt_input(value, ty, contract, user)
    }
}
