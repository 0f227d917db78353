//! Secondary index from file hash to batch positions.
//!
//! Built incrementally as batches are read from a witness. It only tells a
//! reader where to look; the witness log stays the source of truth, and
//! callers must re-check the event they find at an indexed position.

use std::collections::HashMap;

use tracing::warn;

use notary_contracts::{batch::Batch, event::EventAction, Digest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub batch_number: u64,
    pub position: usize,
    pub action: EventAction,
}

#[derive(Debug, Default)]
pub struct BatchIndex {
    entries: HashMap<Digest, Vec<IndexEntry>>,
    next_batch: u64,
}

impl BatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches indexed so far; also the next expected batch number.
    pub fn next_batch(&self) -> u64 {
        self.next_batch
    }

    /// Index `batches`, which should start at `next_batch()`.
    ///
    /// Batches already indexed are skipped. Indexing stops at the first gap
    /// so entries always describe a contiguous prefix of the log. Returns
    /// the number of batches added.
    pub fn ingest(&mut self, batches: &[Batch]) -> usize {
        let mut added = 0;
        for batch in batches {
            let number = batch.header.batch_number;
            if number < self.next_batch {
                continue;
            }
            if number > self.next_batch {
                warn!(expected = self.next_batch, found = number, "gap in witness history; index stopped");
                break;
            }
            for (position, chained) in batch.events.iter().enumerate() {
                self.entries
                    .entry(chained.event.file_hash)
                    .or_default()
                    .push(IndexEntry {
                        batch_number: number,
                        position,
                        action: chained.event.action,
                    });
            }
            self.next_batch += 1;
            added += 1;
        }
        added
    }

    /// All indexed events for `file_hash`, in log order.
    pub fn entries_for(&self, file_hash: &Digest) -> &[IndexEntry] {
        self.entries.get(file_hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The earliest upload of `file_hash`.
    pub fn first_upload(&self, file_hash: &Digest) -> Option<IndexEntry> {
        self.entries_for(file_hash)
            .iter()
            .find(|e| e.action == EventAction::Upload)
            .copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_batch = 0;
    }
}
