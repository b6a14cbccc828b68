//! Homomorphic operations on ciphertext handles
//!
//! The contract only ever sees handles. Every operation returns a fresh
//! handle; the plaintext behind it stays with whoever holds the key.
//! [`MockCoprocessor`] keeps plaintexts in a keyed table so the whole
//! battle lifecycle can run in-process with the same call pattern a real
//! FHE backend would see.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::errors::FheError;
use crate::types::{Address, EncryptedInput, FheType, Handle};
use crate::FheResult;

/// Operations a contract may perform on encrypted values
pub trait Coprocessor: Send + Sync {
    /// Check that `input` was encrypted for `(contract, user)` and has type `ty`
    fn verify_input(
        &self,
        input: &EncryptedInput,
        ty: FheType,
        contract: Address,
        user: Address,
    ) -> FheResult<Handle>;

    /// Encrypt a public constant
    fn trivial_encrypt(&self, value: u64, ty: FheType) -> FheResult<Handle>;

    /// Wrapping addition of two values of the same type
    fn add(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle>;

    /// Encrypted equality against a plaintext scalar
    fn eq_scalar(&self, lhs: &Handle, scalar: u64) -> FheResult<Handle>;

    fn and(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle>;

    fn or(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle>;

    fn not(&self, value: &Handle) -> FheResult<Handle>;

    /// `cond ? if_true : if_false`
    fn select(&self, cond: &Handle, if_true: &Handle, if_false: &Handle) -> FheResult<Handle>;

    /// Encrypted uniformly random bit
    fn random_bool(&self) -> FheResult<Handle>;
}

/// Key holder able to turn handles back into plaintext
pub trait Decryptor: Send + Sync {
    fn decrypt(&self, handle: &Handle) -> FheResult<u64>;
}

#[derive(Clone, Copy, Debug)]
struct Plaintext {
    ty: FheType,
    value: u64,
}

/// In-process coprocessor backed by a plaintext table. Handles are never
/// collected, so the table grows with every operation.
pub struct MockCoprocessor {
    /// Key for handle and proof derivation
    key: [u8; 32],
    /// Handle -> plaintext
    table: RwLock<HashMap<Handle, Plaintext>>,
    /// Uniqueness counter for derived handles
    counter: AtomicU64,
    rng: Mutex<StdRng>,
}

impl MockCoprocessor {
    /// Create a coprocessor with a random key
    pub fn new() -> Self {
        let mut rng = StdRng::from_entropy();
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self::with_parts(key, rng)
    }

    /// Create a coprocessor whose keys and random bits derive from `seed`
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self::with_parts(key, rng)
    }

    fn with_parts(key: [u8; 32], rng: StdRng) -> Self {
        Self {
            key,
            table: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            rng: Mutex::new(rng),
        }
    }

    /// Encrypt a user choice for a given contract and user, producing a
    /// handle plus a proof binding it to that pair
    pub fn encrypt_input(
        &self,
        value: u64,
        ty: FheType,
        contract: Address,
        user: Address,
    ) -> FheResult<EncryptedInput> {
        if value > ty.max_value() {
            return Err(FheError::ValueOutOfRange { value, ty });
        }
        let handle = self.insert(b"input", &[], Plaintext { ty, value });
        let proof = self.input_proof(&handle, ty, contract, user);
        Ok(EncryptedInput::new(handle, proof.to_vec()))
    }

    /// Number of live ciphertexts
    pub fn ciphertext_count(&self) -> usize {
        self.table.read().len()
    }

    fn input_proof(&self, handle: &Handle, ty: FheType, contract: Address, user: Address) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"input-proof");
        hasher.update(handle.as_bytes());
        hasher.update(&[ty.tag()]);
        hasher.update(contract.as_bytes());
        hasher.update(user.as_bytes());
        *hasher.finalize().as_bytes()
    }

    fn insert(&self, op: &[u8], operands: &[&Handle], plaintext: Plaintext) -> Handle {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(op);
        hasher.update(&nonce.to_le_bytes());
        hasher.update(&[plaintext.ty.tag()]);
        for operand in operands {
            hasher.update(operand.as_bytes());
        }
        let handle = Handle(*hasher.finalize().as_bytes());
        self.table.write().insert(handle, plaintext);
        handle
    }

    fn lookup(&self, handle: &Handle) -> FheResult<Plaintext> {
        self.table
            .read()
            .get(handle)
            .copied()
            .ok_or_else(|| FheError::UnknownHandle(handle.to_string()))
    }

    fn lookup_typed(&self, handle: &Handle, expected: FheType) -> FheResult<Plaintext> {
        let plaintext = self.lookup(handle)?;
        if plaintext.ty != expected {
            return Err(FheError::TypeMismatch { expected, got: plaintext.ty });
        }
        Ok(plaintext)
    }

    fn bool_op(&self, op: &[u8], lhs: &Handle, rhs: &Handle, f: impl Fn(u64, u64) -> u64) -> FheResult<Handle> {
        let a = self.lookup_typed(lhs, FheType::Bool)?;
        let b = self.lookup_typed(rhs, FheType::Bool)?;
        let value = f(a.value, b.value) & 1;
        Ok(self.insert(op, &[lhs, rhs], Plaintext { ty: FheType::Bool, value }))
    }
}

impl Default for MockCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Coprocessor for MockCoprocessor {
    fn verify_input(
        &self,
        input: &EncryptedInput,
        ty: FheType,
        contract: Address,
        user: Address,
    ) -> FheResult<Handle> {
        let expected = self.input_proof(&input.handle, ty, contract, user);
        if input.proof.as_slice() != expected.as_slice() {
            return Err(FheError::InvalidProof(format!(
                "proof for {} is not bound to contract {} and user {}",
                input.handle, contract, user
            )));
        }
        self.lookup_typed(&input.handle, ty)?;
        Ok(input.handle)
    }

    fn trivial_encrypt(&self, value: u64, ty: FheType) -> FheResult<Handle> {
        if value > ty.max_value() {
            return Err(FheError::ValueOutOfRange { value, ty });
        }
        Ok(self.insert(b"trivial", &[], Plaintext { ty, value }))
    }

    fn add(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle> {
        let a = self.lookup(lhs)?;
        let b = self.lookup_typed(rhs, a.ty)?;
        let value = a.ty.wrap(a.value.wrapping_add(b.value));
        Ok(self.insert(b"add", &[lhs, rhs], Plaintext { ty: a.ty, value }))
    }

    fn eq_scalar(&self, lhs: &Handle, scalar: u64) -> FheResult<Handle> {
        let a = self.lookup(lhs)?;
        let value = u64::from(a.value == scalar);
        Ok(self.insert(b"eq", &[lhs], Plaintext { ty: FheType::Bool, value }))
    }

    fn and(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle> {
        self.bool_op(b"and", lhs, rhs, |a, b| a & b)
    }

    fn or(&self, lhs: &Handle, rhs: &Handle) -> FheResult<Handle> {
        self.bool_op(b"or", lhs, rhs, |a, b| a | b)
    }

    fn not(&self, value: &Handle) -> FheResult<Handle> {
        let a = self.lookup_typed(value, FheType::Bool)?;
        Ok(self.insert(b"not", &[value], Plaintext { ty: FheType::Bool, value: a.value ^ 1 }))
    }

    fn select(&self, cond: &Handle, if_true: &Handle, if_false: &Handle) -> FheResult<Handle> {
        let c = self.lookup_typed(cond, FheType::Bool)?;
        let t = self.lookup(if_true)?;
        let f = self.lookup_typed(if_false, t.ty)?;
        let chosen = if c.value == 1 { t } else { f };
        Ok(self.insert(b"select", &[cond, if_true, if_false], chosen))
    }

    fn random_bool(&self) -> FheResult<Handle> {
        let bit = u64::from(self.rng.lock().gen::<bool>());
        Ok(self.insert(b"rand", &[], Plaintext { ty: FheType::Bool, value: bit }))
    }
}

impl Decryptor for MockCoprocessor {
    fn decrypt(&self, handle: &Handle) -> FheResult<u64> {
        self.lookup(handle)
            .map(|p| p.value)
            .map_err(|e| FheError::DecryptionFailed(e.to_string()))
    }
}
