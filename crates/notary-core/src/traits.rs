//! Capability traits for the notary pipeline.
//!
//! These three traits are the boundary between the integrity logic and its
//! collaborators:
//!
//! - `ChainSigner`: trusted; sole owner of the chain head and signing key
//! - `RecordStore`: untrusted byte storage keyed by content hash
//! - `WitnessLog`: one independent append-only replica of published batches
//!
//! The log server and verifier are written against these traits only. A
//! hardware-backed or remote signer substitutes for the in-process one
//! without touching either.

use notary_contracts::{
    batch::{Batch, BatchHeader},
    error::NotaryResult,
    event::{ChainedEvent, Event},
    Digest, SignatureBytes,
};

use crate::crypto::VerifyingKey;

/// The trusted signer: chains and signs events in one atomic step.
pub trait ChainSigner: Send + Sync {
    /// Chain `event` onto the current head and sign it.
    ///
    /// Implementations must compute `H(H(event) || head)`, advance the head,
    /// and sign the event's canonical bytes as a single step that no other
    /// caller can observe half-done. A failure that could leave the head and
    /// signatures out of step is fatal: return `ChainStateCorruption` and
    /// refuse every later call with `SignerHalted`.
    fn record(&self, event: Event) -> NotaryResult<ChainedEvent>;

    /// Current chain head. Reflects some prefix of recorded events.
    fn latest_hash(&self) -> NotaryResult<Digest>;

    /// Sign a batch header's canonical bytes with the same trusted key.
    fn sign_header(&self, header: &BatchHeader) -> NotaryResult<SignatureBytes>;

    /// Public half of the signing key, distributed to verifiers.
    fn verifying_key(&self) -> VerifyingKey;
}

/// Content-addressed byte storage. No integrity logic of its own.
pub trait RecordStore: Send + Sync {
    /// Store `bytes` under `key`. Overwrites silently.
    fn put(&self, key: &Digest, bytes: &[u8]) -> NotaryResult<()>;

    /// Fetch the bytes under `key`, or `None` when absent.
    fn get(&self, key: &Digest) -> NotaryResult<Option<Vec<u8>>>;

    /// Remove `key`. Returns whether an object was present; absence is not
    /// an error.
    fn delete(&self, key: &Digest) -> NotaryResult<bool>;

    fn contains(&self, key: &Digest) -> NotaryResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// One replica of the published batch history.
///
/// Implementations accept appends only. A batch whose number is already
/// held is accepted again only if it is identical; anything else, and any
/// gap in numbering, is rejected with `WitnessRejected`.
pub trait WitnessLog: Send + Sync {
    /// Stable name used in logs and audit evidence.
    fn id(&self) -> &str;

    fn append(&self, batch: &Batch) -> NotaryResult<()>;

    /// Batches from position `start` onward. Finite at the time of the call;
    /// a later call never returns fewer batches.
    fn read_from(&self, start: usize) -> NotaryResult<Vec<Batch>>;

    fn read_all(&self) -> NotaryResult<Vec<Batch>> {
        self.read_from(0)
    }
}
