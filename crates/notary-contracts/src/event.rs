//! Logged events and their chained, signed form.
//!
//! `Event` is what happened; `ChainedEvent` is the event after the chain
//! signer bound it into the total order and signed it.
//!
//! Canonical encoding (compact JSON, fields in declaration order):
//!
//! ```text
//! {"action":"upload","file_hash":"<64 hex>","timestamp":<epoch ms>,"metadata":{"filename":"doc1.txt"}}
//! {"action":"delete","file_hash":"<64 hex>","timestamp":<epoch ms>,"metadata":{"user_id":"admin"}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    error::NotaryResult,
    hash::{Digest, SignatureBytes},
};

/// What was done to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Upload,
    Delete,
}

/// Action-specific context: uploads carry a filename, deletes the actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMetadata {
    Filename(String),
    UserId(String),
}

/// A single logged action. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub action: EventAction,
    pub file_hash: Digest,
    /// Epoch milliseconds (UTC).
    pub timestamp: u64,
    pub metadata: EventMetadata,
}

impl Event {
    pub fn upload(file_hash: Digest, filename: impl Into<String>, timestamp: u64) -> Self {
        Self {
            action: EventAction::Upload,
            file_hash,
            timestamp,
            metadata: EventMetadata::Filename(filename.into()),
        }
    }

    pub fn delete(file_hash: Digest, user_id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            action: EventAction::Delete,
            file_hash,
            timestamp,
            metadata: EventMetadata::UserId(user_id.into()),
        }
    }

    /// The exact bytes that are hashed and signed for this event.
    pub fn canonical_bytes(&self) -> NotaryResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// An event after the chain signer recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedEvent {
    pub event: Event,
    /// `H(H(event) || previous chain_hash)`.
    pub chain_hash: Digest,
    /// Signature over `event.canonical_bytes()`.
    pub signature: SignatureBytes,
}
