//! Hash-chain primitives: linking and chain integrity verification.
//!
//! Each link commits to the event and everything before it:
//!
//!   chain_hash_i = SHA-256( SHA-256(canonical(event_i)) || chain_hash_{i-1} )
//!
//! with `chain_hash_{-1} = SHA-256("genesis")`. Both operands are the raw
//! 32-byte digests, not their hex text.

use notary_contracts::{
    error::NotaryResult,
    event::{ChainedEvent, Event},
    Digest,
};
use notary_core::crypto::{hash_event, hash_pair};

/// Compute the chain hash that follows `prev` once `event` is recorded.
pub fn next_chain_hash(event: &Event, prev: &Digest) -> NotaryResult<Digest> {
    Ok(hash_pair(&hash_event(event)?, prev))
}

/// Verify that `events` form an unbroken chain starting after `start`.
///
/// Returns `true` when every event's `chain_hash` equals the value
/// recomputed from its own event and the preceding link. An empty slice is
/// valid. Signatures are not checked here.
pub fn verify_chain(events: &[ChainedEvent], start: &Digest) -> bool {
    let mut expected_prev = *start;

    for chained in events {
        let recomputed = match next_chain_hash(&chained.event, &expected_prev) {
            Ok(h) => h,
            Err(_) => return false,
        };
        if chained.chain_hash != recomputed {
            return false;
        }
        expected_prev = recomputed;
    }

    true
}
