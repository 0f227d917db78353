//! Error types for the notary pipeline.
//!
//! All fallible operations across the workspace return `NotaryResult<T>`.
//! The first four variants mirror the four verification checks; the rest
//! cover storage, witness, and signer failures.

use thiserror::Error;

/// The unified error type for the record notary.
#[derive(Debug, Error)]
pub enum NotaryError {
    /// Downloaded bytes do not hash to the logged `file_hash`.
    #[error("integrity failure: {reason}")]
    IntegrityFailure { reason: String },

    /// An event or batch header signature is missing or does not verify.
    #[error("authenticity failure: {reason}")]
    AuthenticityFailure { reason: String },

    /// The event is not provably committed by the claimed batch.
    #[error("inclusion failure: {reason}")]
    InclusionFailure { reason: String },

    /// Fewer witnesses than the configured quorum answered in time.
    #[error("witness quorum not met: {reason}")]
    WitnessUnavailable { reason: String },

    /// The object is absent from the record store.
    ///
    /// The cause is deliberately ambiguous: a logged deletion and a silent
    /// one look the same from a download.
    #[error("file {file_hash} not found")]
    NotFound { file_hash: String },

    /// The chain head and signing state desynchronized.
    ///
    /// Fatal for the signer instance: it halts and refuses further records.
    #[error("chain state corruption: {reason}")]
    ChainStateCorruption { reason: String },

    /// The signer halted after an earlier fatal error.
    #[error("chain signer halted; no further events can be recorded")]
    SignerHalted,

    /// The record store could not complete an operation.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A witness refused an append (gap or conflicting rewrite).
    #[error("witness '{witness}' rejected append: {reason}")]
    WitnessRejected { witness: String, reason: String },

    /// A value could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A Merkle proof could not be built for the requested leaf.
    #[error("invalid proof request: {reason}")]
    InvalidProof { reason: String },
}

/// Convenience alias used throughout the notary crates.
pub type NotaryResult<T> = Result<T, NotaryError>;

impl From<serde_json::Error> for NotaryError {
    fn from(e: serde_json::Error) -> Self {
        NotaryError::Serialization {
            reason: e.to_string(),
        }
    }
}
