//! Download verification packages and reports.
//!
//! A `VerificationPackage` is assembled per download and never persisted.
//! The verifier runs four checks against it in order and stops at the first
//! failure; the resulting `VerificationReport` names the failing check.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    batch::{Batch, MerkleProof},
    error::{NotaryError, NotaryResult},
    event::Event,
    hash::{Digest, SignatureBytes},
};

/// Everything a client needs to check a downloaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationPackage {
    pub file_content: Vec<u8>,
    pub event: Event,
    pub chain_hash: Digest,
    /// `None` models a server that withheld the signature; check 2 fails.
    pub signature: Option<SignatureBytes>,
    pub merkle_proof: MerkleProof,
    /// The published batch that contains `event`.
    pub latest_batch: Batch,
}

/// The four checks, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationCheck {
    ContentIntegrity,
    EventAuthenticity,
    BatchInclusion,
    WitnessAvailability,
}

impl VerificationCheck {
    /// 1-based position in the protocol.
    pub fn number(self) -> u8 {
        match self {
            VerificationCheck::ContentIntegrity => 1,
            VerificationCheck::EventAuthenticity => 2,
            VerificationCheck::BatchInclusion => 3,
            VerificationCheck::WitnessAvailability => 4,
        }
    }
}

impl fmt::Display for VerificationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerificationCheck::ContentIntegrity => "content integrity",
            VerificationCheck::EventAuthenticity => "event authenticity",
            VerificationCheck::BatchInclusion => "batch inclusion",
            VerificationCheck::WitnessAvailability => "witness availability",
        };
        write!(f, "check {} ({name})", self.number())
    }
}

/// The check that failed and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub check: VerificationCheck,
    pub reason: String,
}

impl VerificationFailure {
    /// Map to the error variant for this check.
    pub fn into_error(self) -> NotaryError {
        let reason = self.reason;
        match self.check {
            VerificationCheck::ContentIntegrity => NotaryError::IntegrityFailure { reason },
            VerificationCheck::EventAuthenticity => NotaryError::AuthenticityFailure { reason },
            VerificationCheck::BatchInclusion => NotaryError::InclusionFailure { reason },
            VerificationCheck::WitnessAvailability => NotaryError::WitnessUnavailable { reason },
        }
    }
}

/// Outcome of `verify_download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if all four checks passed.
    pub passed: bool,
    /// Checks that passed before the run stopped, in order.
    pub checks_passed: Vec<VerificationCheck>,
    /// The first failure. `None` on pass.
    pub failure: Option<VerificationFailure>,
}

impl VerificationReport {
    pub fn failed_check(&self) -> Option<VerificationCheck> {
        self.failure.as_ref().map(|f| f.check)
    }

    /// Convert to a `Result`, surfacing the failing check as its error variant.
    pub fn into_result(self) -> NotaryResult<()> {
        match self.failure {
            None => Ok(()),
            Some(failure) => Err(failure.into_error()),
        }
    }
}
