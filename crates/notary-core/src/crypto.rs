//! Hash and signature primitives.
//!
//! Hashing is SHA-256 throughout. Signatures are Ed25519 over the canonical
//! bytes defined in `notary-contracts`. Everything here is a pure function.
//!
//! Byte layouts fed into SHA-256:
//!   - event hash:   canonical JSON of the `Event`
//!   - header hash:  canonical JSON of the `BatchHeader`
//!   - chain link:   32-byte event hash, then 32-byte previous chain hash
//!   - Merkle node:  32-byte left child, then 32-byte right child

use ed25519_dalek::{Signature, Signer};
use sha2::{Digest as _, Sha256};

pub use ed25519_dalek::{SigningKey, VerifyingKey};

use notary_contracts::{
    batch::BatchHeader,
    error::NotaryResult,
    event::Event,
    Digest, SignatureBytes,
};

/// Input hashed to obtain the chain head before any event, and the
/// `previous_batch_header_hash` of batch 0.
pub const GENESIS_MARKER: &[u8] = b"genesis";

pub fn sha256(data: &[u8]) -> Digest {
    Digest::from_bytes(Sha256::digest(data).into())
}

/// `H(left || right)` over raw digest bytes.
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::from_bytes(hasher.finalize().into())
}

/// `H("genesis")`.
pub fn genesis_hash() -> Digest {
    sha256(GENESIS_MARKER)
}

/// Identity of an event: the hash of its canonical serialization.
pub fn hash_event(event: &Event) -> NotaryResult<Digest> {
    Ok(sha256(&event.canonical_bytes()?))
}

pub fn hash_header(header: &BatchHeader) -> NotaryResult<Digest> {
    Ok(sha256(&header.canonical_bytes()?))
}

pub fn sign(key: &SigningKey, message: &[u8]) -> SignatureBytes {
    SignatureBytes::new(key.sign(message).to_bytes().to_vec())
}

/// Strict Ed25519 verification. Malformed signature bytes verify as false.
pub fn verify_signature(key: &VerifyingKey, message: &[u8], signature: &SignatureBytes) -> bool {
    match Signature::from_slice(signature.as_bytes()) {
        Ok(sig) => key.verify_strict(message, &sig).is_ok(),
        Err(_) => false,
    }
}

/// Hex encoding of a verifying key, for logs and key files.
pub fn verifying_key_hex(key: &VerifyingKey) -> String {
    hex::encode(key.as_bytes())
}
