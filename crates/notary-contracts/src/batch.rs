//! Published batches and Merkle inclusion proofs.
//!
//! Header canonical encoding:
//!
//! ```text
//! {"batch_number":0,"merkle_root":"<hex>","final_chain_hash":"<hex>","previous_batch_header_hash":"<hex>","timestamp":<epoch ms>}
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::NotaryResult,
    event::{ChainedEvent, EventAction},
    hash::{Digest, SignatureBytes},
};

/// The signed summary of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    /// Starts at 0 and increases by exactly 1 per publication.
    pub batch_number: u64,
    /// Merkle root over the hashes of the committed events, in order.
    pub merkle_root: Digest,
    /// Chain head after the last event in this batch.
    pub final_chain_hash: Digest,
    /// Hash of the previous header's canonical bytes, or the genesis marker.
    pub previous_batch_header_hash: Digest,
    /// Epoch milliseconds (UTC).
    pub timestamp: u64,
}

impl BatchHeader {
    /// The exact bytes that are hashed and signed for this header.
    pub fn canonical_bytes(&self) -> NotaryResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// A header, its signature, and the events it commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub header: BatchHeader,
    pub signature: SignatureBytes,
    pub events: Vec<ChainedEvent>,
}

impl Batch {
    /// Position of the first event matching `file_hash` and `action`.
    pub fn position_of(&self, file_hash: &Digest, action: EventAction) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.event.action == action && &e.event.file_hash == file_hash)
    }
}

/// Which side of the running hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Combine as `H(sibling || current)`.
    Left,
    /// Combine as `H(current || sibling)`.
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

/// An inclusion proof for the leaf at `leaf_index`, siblings bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub steps: Vec<ProofStep>,
}
