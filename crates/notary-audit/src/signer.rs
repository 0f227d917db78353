//! In-process implementation of `ChainSigner`.
//!
//! `InMemoryChainSigner` simulates the trusted hardware signer: it holds the
//! Ed25519 key and the chain head, and both only change inside `record()`
//! while the state lock is held. Nothing outside this module can reach the
//! head except through `record()` and `latest_hash()`.
//!
//! A poisoned lock means some thread panicked mid-record and the head can no
//! longer be trusted to match the signatures already issued. The signer then
//! halts for good.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rand::rngs::OsRng;
use tracing::{debug, error, info};
use zeroize::Zeroize;

use notary_contracts::{
    batch::BatchHeader,
    error::{NotaryError, NotaryResult},
    event::{ChainedEvent, Event},
    Digest, SignatureBytes,
};
use notary_core::{
    crypto::{genesis_hash, hash_pair, sha256, sign, verifying_key_hex, SigningKey, VerifyingKey},
    traits::ChainSigner,
};

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct SignerState {
    /// Current chain head; `H("genesis")` before any event.
    pub(crate) head: Digest,

    /// Events recorded by this instance (including any resumed count).
    pub(crate) recorded: u64,
}

// ── Public signer ─────────────────────────────────────────────────────────────

/// Holds the signing key and the chain head behind one lock.
#[derive(Debug)]
pub struct InMemoryChainSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    pub(crate) state: Mutex<SignerState>,
    halted: AtomicBool,
}

impl InMemoryChainSigner {
    /// Start a fresh chain at genesis with `signing_key`.
    pub fn new(signing_key: SigningKey) -> Self {
        Self::resume(signing_key, genesis_hash(), 0)
    }

    /// Start a fresh chain with a newly generated key.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Load a 32-byte Ed25519 secret. The temporary copy is zeroized.
    pub fn from_secret_bytes(secret: &[u8]) -> NotaryResult<Self> {
        if secret.len() != 32 {
            return Err(NotaryError::ConfigError {
                reason: format!("invalid signing key length: {} (expected 32)", secret.len()),
            });
        }
        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(secret);
        let signing_key = SigningKey::from_bytes(&key_array);
        key_array.zeroize();
        Ok(Self::new(signing_key))
    }

    /// Continue an existing chain from `head` after a restart.
    pub fn resume(signing_key: SigningKey, head: Digest, recorded: u64) -> Self {
        let verifying_key = signing_key.verifying_key();
        info!(
            public_key = %verifying_key_hex(&verifying_key),
            head = %head.short(),
            recorded,
            "chain signer initialized"
        );
        Self {
            signing_key,
            verifying_key,
            state: Mutex::new(SignerState { head, recorded }),
            halted: AtomicBool::new(false),
        }
    }

    /// Secret key bytes, for persisting a generated key.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn recorded_count(&self) -> NotaryResult<u64> {
        self.ensure_running()?;
        let state = self.state.lock().map_err(|e| self.halt(format!("state lock poisoned: {e}")))?;
        Ok(state.recorded)
    }

    fn ensure_running(&self) -> NotaryResult<()> {
        if self.is_halted() {
            return Err(NotaryError::SignerHalted);
        }
        Ok(())
    }

    /// Stop all further recording and report the corruption.
    fn halt(&self, reason: String) -> NotaryError {
        self.halted.store(true, Ordering::SeqCst);
        error!(%reason, "chain signer halted");
        NotaryError::ChainStateCorruption { reason }
    }
}

// ── ChainSigner impl ──────────────────────────────────────────────────────────

impl ChainSigner for InMemoryChainSigner {
    fn record(&self, event: Event) -> NotaryResult<ChainedEvent> {
        self.ensure_running()?;

        // Encoding can fail without touching state, so do it before locking.
        let bytes = event.canonical_bytes()?;
        let event_hash = sha256(&bytes);

        let mut state = self
            .state
            .lock()
            .map_err(|e| self.halt(format!("state lock poisoned during record: {e}")))?;

        let chain_hash = hash_pair(&event_hash, &state.head);
        let signature = sign(&self.signing_key, &bytes);
        state.head = chain_hash;
        state.recorded += 1;

        debug!(
            action = ?event.action,
            file_hash = %event.file_hash.short(),
            chain_hash = %chain_hash.short(),
            sequence = state.recorded,
            "event chained and signed"
        );

        Ok(ChainedEvent {
            event,
            chain_hash,
            signature,
        })
    }

    fn latest_hash(&self) -> NotaryResult<Digest> {
        self.ensure_running()?;
        let state = self
            .state
            .lock()
            .map_err(|e| self.halt(format!("state lock poisoned during read: {e}")))?;
        Ok(state.head)
    }

    fn sign_header(&self, header: &BatchHeader) -> NotaryResult<SignatureBytes> {
        self.ensure_running()?;
        Ok(sign(&self.signing_key, &header.canonical_bytes()?))
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }
}
