//! Whole-history checks over published batches.
//!
//! `verify_history` replays one witness's log from batch 0 and checks every
//! link the server committed to. `cross_check_witnesses` compares replicas
//! against each other without trusting any of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use notary_audit::next_chain_hash;
use notary_contracts::{
    batch::Batch,
    error::{NotaryError, NotaryResult},
    Digest,
};
use notary_core::{
    crypto::{genesis_hash, hash_event, hash_header, verify_signature, VerifyingKey},
    merkle,
};
use notary_witness::{WitnessFailure, WitnessSet};

/// Totals from a history that verified end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub batches: usize,
    pub events: usize,
    /// Chain head after the last event; genesis for an empty history.
    pub chain_head: Digest,
    /// Hash of the last header; genesis for an empty history.
    pub last_header_hash: Digest,
}

/// Verify a complete batch history starting at batch 0.
///
/// Checks, per batch:
/// - numbering is contiguous from 0
/// - `previous_batch_header_hash` links to the prior header
/// - the header signature verifies under `key`
/// - the Merkle root matches the committed events
/// - every event signature verifies under `key`
/// - every chain hash recomputes from genesis, and the batch's last chain
///   hash equals `final_chain_hash`
pub fn verify_history(batches: &[Batch], key: &VerifyingKey) -> NotaryResult<HistorySummary> {
    let mut chain_head = genesis_hash();
    let mut last_header_hash = genesis_hash();
    let mut events = 0usize;

    for (expected_number, batch) in (0u64..).zip(batches) {
        let header = &batch.header;
        let n = header.batch_number;

        if n != expected_number {
            return Err(NotaryError::InclusionFailure {
                reason: format!("expected batch {expected_number}, found {n}"),
            });
        }
        if header.previous_batch_header_hash != last_header_hash {
            return Err(NotaryError::InclusionFailure {
                reason: format!("batch {n} does not link to the previous header"),
            });
        }
        if !verify_signature(key, &header.canonical_bytes()?, &batch.signature) {
            return Err(NotaryError::AuthenticityFailure {
                reason: format!("batch {n} header signature invalid"),
            });
        }

        let mut leaves = Vec::with_capacity(batch.events.len());
        for (position, chained) in batch.events.iter().enumerate() {
            if !verify_signature(key, &chained.event.canonical_bytes()?, &chained.signature) {
                return Err(NotaryError::AuthenticityFailure {
                    reason: format!("batch {n} event {position} signature invalid"),
                });
            }
            let recomputed = next_chain_hash(&chained.event, &chain_head)?;
            if recomputed != chained.chain_hash {
                return Err(NotaryError::IntegrityFailure {
                    reason: format!("batch {n} event {position} breaks the event chain"),
                });
            }
            chain_head = recomputed;
            leaves.push(hash_event(&chained.event)?);
        }

        if merkle::build_root(&leaves) != header.merkle_root {
            return Err(NotaryError::InclusionFailure {
                reason: format!("batch {n} Merkle root does not match its events"),
            });
        }
        if chain_head != header.final_chain_hash {
            return Err(NotaryError::IntegrityFailure {
                reason: format!("batch {n} final chain hash does not match its last event"),
            });
        }

        last_header_hash = hash_header(header)?;
        events += batch.events.len();
        debug!(batch_number = n, events = batch.events.len(), "batch verified");
    }

    Ok(HistorySummary {
        batches: batches.len(),
        events,
        chain_head,
        last_header_hash,
    })
}

/// Header hashes that disagree for one batch number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    pub batch_number: u64,
    /// `(witness, header hash)` for every replica holding this batch.
    pub held: Vec<(String, Digest)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// `(witness, batches held)` for every reachable replica.
    pub lengths: Vec<(String, usize)>,
    pub divergent: Vec<Divergence>,
    /// Reachable replicas holding fewer batches than the longest one.
    pub lagging: Vec<String>,
    pub unreachable: Vec<WitnessFailure>,
}

impl ConsistencyReport {
    /// No divergent headers. Lag and unreachable replicas are not counted.
    pub fn is_consistent(&self) -> bool {
        self.divergent.is_empty()
    }
}

/// Compare header hashes batch by batch across all reachable replicas.
pub fn cross_check_witnesses(witnesses: &WitnessSet) -> NotaryResult<ConsistencyReport> {
    let readout = witnesses.read_all();

    let mut by_number: BTreeMap<u64, Vec<(String, Digest)>> = BTreeMap::new();
    let mut lengths = Vec::with_capacity(readout.reachable.len());
    for (witness, batches) in &readout.reachable {
        lengths.push((witness.clone(), batches.len()));
        for batch in batches {
            by_number
                .entry(batch.header.batch_number)
                .or_default()
                .push((witness.clone(), hash_header(&batch.header)?));
        }
    }

    let divergent: Vec<Divergence> = by_number
        .into_iter()
        .filter(|(_, held)| held.windows(2).any(|w| w[0].1 != w[1].1))
        .map(|(batch_number, held)| Divergence { batch_number, held })
        .collect();

    let longest = lengths.iter().map(|(_, len)| *len).max().unwrap_or(0);
    let lagging: Vec<String> = lengths
        .iter()
        .filter(|(_, len)| *len < longest)
        .map(|(w, _)| w.clone())
        .collect();

    for d in &divergent {
        warn!(batch_number = d.batch_number, replicas = d.held.len(), "witnesses disagree on batch header");
    }
    if !lagging.is_empty() {
        debug!(?lagging, longest, "some witnesses are behind");
    }

    Ok(ConsistencyReport {
        lengths,
        divergent,
        lagging,
        unreachable: readout.unreachable,
    })
}
