//! # notary-witness
//!
//! Append-only witness replicas of the published batch history.
//!
//! ## Overview
//!
//! - [`MemoryWitness`] and [`FileWitness`] implement
//!   [`WitnessLog`](notary_core::traits::WitnessLog). Both accept appends
//!   only: the next batch number, or an identical copy of a batch already
//!   held. Gaps and conflicting rewrites are rejected.
//! - [`WitnessSet`] fans publications and reads out to all replicas in
//!   parallel, bounded by a timeout, and applies a k-of-N quorum.
//! - [`BatchIndex`] maps file hashes to batch positions so lookups need not
//!   rescan the whole history.

pub mod file;
pub mod index;
pub mod memory;
pub mod set;

pub use file::{open_file_witnesses, FileWitness};
pub use index::{BatchIndex, IndexEntry};
pub use memory::MemoryWitness;
pub use set::{PublishReceipt, WitnessFailure, WitnessReadout, WitnessSet};

use notary_contracts::error::{NotaryError, NotaryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppendAction {
    Append,
    AlreadyHeld,
}

/// Decide whether batch `batch_number` may be appended to a replica that
/// holds `held` batches. `same_as_held(n)` reports whether the incoming batch
/// is identical to the one stored at position `n`.
pub(crate) fn check_append(
    witness: &str,
    held: usize,
    batch_number: u64,
    same_as_held: impl FnOnce(usize) -> bool,
) -> NotaryResult<AppendAction> {
    let position = usize::try_from(batch_number).map_err(|_| NotaryError::WitnessRejected {
        witness: witness.to_string(),
        reason: format!("batch number {batch_number} out of range"),
    })?;

    if position == held {
        Ok(AppendAction::Append)
    } else if position < held {
        if same_as_held(position) {
            Ok(AppendAction::AlreadyHeld)
        } else {
            Err(NotaryError::WitnessRejected {
                witness: witness.to_string(),
                reason: format!("batch {batch_number} already published with different content"),
            })
        }
    } else {
        Err(NotaryError::WitnessRejected {
            witness: witness.to_string(),
            reason: format!("batch {batch_number} would leave a gap after {held} batches"),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use notary_contracts::{
        batch::{Batch, BatchHeader},
        error::{NotaryError, NotaryResult},
        event::{ChainedEvent, Event, EventAction},
        SignatureBytes,
    };
    use notary_core::{
        crypto::{genesis_hash, sha256},
        traits::WitnessLog,
    };

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn chained(event: Event) -> ChainedEvent {
        ChainedEvent {
            event,
            chain_hash: genesis_hash(),
            signature: SignatureBytes::new(vec![0u8; 64]),
        }
    }

    fn batch(number: u64, names: &[&str]) -> Batch {
        Batch {
            header: BatchHeader {
                batch_number: number,
                merkle_root: sha256(format!("root-{number}").as_bytes()),
                final_chain_hash: genesis_hash(),
                previous_batch_header_hash: genesis_hash(),
                timestamp: number,
            },
            signature: SignatureBytes::new(vec![1u8; 64]),
            events: names
                .iter()
                .map(|n| chained(Event::upload(sha256(n.as_bytes()), *n, number)))
                .collect(),
        }
    }

    /// Answers every call after `delay`.
    struct SlowWitness {
        inner: MemoryWitness,
        delay: Duration,
    }

    impl WitnessLog for SlowWitness {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn append(&self, batch: &Batch) -> NotaryResult<()> {
            thread::sleep(self.delay);
            self.inner.append(batch)
        }
        fn read_from(&self, start: usize) -> NotaryResult<Vec<Batch>> {
            thread::sleep(self.delay);
            self.inner.read_from(start)
        }
    }

    /// Fails every call.
    struct DownWitness(String);

    impl DownWitness {
        fn refused(&self) -> NotaryError {
            NotaryError::WitnessRejected {
                witness: self.0.clone(),
                reason: "connection refused".to_string(),
            }
        }
    }

    impl WitnessLog for DownWitness {
        fn id(&self) -> &str {
            &self.0
        }
        fn append(&self, _batch: &Batch) -> NotaryResult<()> {
            Err(self.refused())
        }
        fn read_from(&self, _start: usize) -> NotaryResult<Vec<Batch>> {
            Err(self.refused())
        }
    }

    fn memory_set(n: usize) -> (Vec<Arc<MemoryWitness>>, WitnessSet) {
        let replicas: Vec<Arc<MemoryWitness>> =
            (1..=n).map(|i| Arc::new(MemoryWitness::new(format!("witness{i}")))).collect();
        let logs = replicas.iter().map(|w| Arc::clone(w) as Arc<dyn WitnessLog>).collect();
        (replicas, WitnessSet::new(logs, Duration::from_millis(500)))
    }

    // ── Append discipline ─────────────────────────────────────────────────────

    #[test]
    fn test_memory_witness_appends_in_order() {
        let w = MemoryWitness::new("w");
        w.append(&batch(0, &["a"])).unwrap();
        w.append(&batch(1, &["b"])).unwrap();
        assert_eq!(w.len().unwrap(), 2);
        assert_eq!(w.read_from(1).unwrap(), vec![batch(1, &["b"])]);
    }

    #[test]
    fn test_gap_is_rejected() {
        let w = MemoryWitness::new("w");
        let err = w.append(&batch(1, &["a"])).unwrap_err();
        assert!(err.to_string().contains("gap"));
        assert!(w.is_empty().unwrap());
    }

    /// Re-sending the same batch is harmless; rewriting it is not.
    #[test]
    fn test_identical_reappend_is_idempotent_conflict_is_rejected() {
        let w = MemoryWitness::new("w");
        w.append(&batch(0, &["a"])).unwrap();
        w.append(&batch(0, &["a"])).unwrap();
        assert_eq!(w.len().unwrap(), 1);

        let err = w.append(&batch(0, &["forged"])).unwrap_err();
        assert!(matches!(err, NotaryError::WitnessRejected { .. }));
        assert_eq!(w.read_all().unwrap(), vec![batch(0, &["a"])]);
    }

    #[test]
    fn test_file_witness_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("witness1.jsonl");
        {
            let w = FileWitness::open("witness1", &path).unwrap();
            w.append(&batch(0, &["a", "b"])).unwrap();
            w.append(&batch(1, &["c"])).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);

        let reopened = FileWitness::open("witness1", &path).unwrap();
        assert_eq!(reopened.read_all().unwrap(), vec![batch(0, &["a", "b"]), batch(1, &["c"])]);

        // Append discipline survives the restart.
        reopened.append(&batch(1, &["c"])).unwrap();
        assert!(reopened.append(&batch(1, &["x"])).is_err());
        assert!(reopened.append(&batch(3, &["x"])).is_err());
        reopened.append(&batch(2, &["d"])).unwrap();
        assert_eq!(reopened.read_from(2).unwrap().len(), 1);
    }

    #[test]
    fn test_open_file_witnesses_names_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let logs = open_file_witnesses(dir.path(), 3).unwrap();
        let ids: Vec<&str> = logs.iter().map(|w| w.id()).collect();
        assert_eq!(ids, vec!["witness1", "witness2", "witness3"]);
        assert!(dir.path().join("witness3.jsonl").is_file());
    }

    // ── Fan-out and quorum ────────────────────────────────────────────────────

    #[test]
    fn test_publish_reaches_all_replicas() {
        let (replicas, set) = memory_set(3);
        let receipt = set.publish(&batch(0, &["a"]), 3).unwrap();
        assert_eq!(receipt.acknowledged.len(), 3);
        assert!(receipt.failed.is_empty());
        for w in &replicas {
            assert_eq!(w.len().unwrap(), 1);
        }
    }

    #[test]
    fn test_publish_tolerates_failures_within_quorum() {
        let healthy = Arc::new(MemoryWitness::new("witness1"));
        let set = WitnessSet::new(
            vec![
                Arc::clone(&healthy) as Arc<dyn WitnessLog>,
                Arc::new(DownWitness("witness2".to_string())),
            ],
            Duration::from_millis(500),
        );

        let receipt = set.publish(&batch(0, &["a"]), 1).unwrap();
        assert_eq!(receipt.acknowledged, vec!["witness1".to_string()]);
        assert_eq!(receipt.failed[0].witness, "witness2");

        let err = set.publish(&batch(1, &["b"]), 2).unwrap_err();
        assert!(matches!(err, NotaryError::WitnessUnavailable { .. }));
    }

    /// A hung replica costs at most the timeout, then counts as failed.
    #[test]
    fn test_slow_replica_times_out() {
        let slow = SlowWitness {
            inner: MemoryWitness::new("slow"),
            delay: Duration::from_secs(2),
        };
        let fast = Arc::new(MemoryWitness::new("fast"));
        let set = WitnessSet::new(
            vec![Arc::new(slow), Arc::clone(&fast) as Arc<dyn WitnessLog>],
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let receipt = set.publish(&batch(0, &["a"]), 1).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(receipt.acknowledged, vec!["fast".to_string()]);
        assert!(receipt.failed[0].reason.contains("no response within 100 ms"));
    }

    #[test]
    fn test_read_canonical_skips_unreachable() {
        let healthy = Arc::new(MemoryWitness::new("witness2"));
        healthy.append(&batch(0, &["a"])).unwrap();
        let set = WitnessSet::new(
            vec![
                Arc::new(DownWitness("witness1".to_string())),
                Arc::clone(&healthy) as Arc<dyn WitnessLog>,
            ],
            Duration::from_millis(500),
        );

        let (id, batches) = set.read_canonical(0).unwrap();
        assert_eq!(id, "witness2");
        assert_eq!(batches.len(), 1);

        let readout = set.read_all();
        assert_eq!(readout.unreachable.len(), 1);
        assert_eq!(readout.unreachable[0].witness, "witness1");
    }

    #[test]
    fn test_read_canonical_with_no_witness_is_unavailable() {
        let set = WitnessSet::new(
            vec![Arc::new(DownWitness("witness1".to_string())) as Arc<dyn WitnessLog>],
            Duration::from_millis(100),
        );
        let err = set.read_canonical(0).unwrap_err();
        assert!(err.to_string().contains("witness1"));
    }

    // ── Index ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_index_finds_first_upload_in_log_order() {
        let mut index = BatchIndex::new();
        let b0 = batch(0, &["a", "b"]);
        let mut b1 = batch(1, &["c", "a"]);
        b1.events.insert(0, chained(Event::delete(sha256(b"a"), "admin", 1)));

        assert_eq!(index.ingest(&[b0.clone()]), 1);
        assert_eq!(index.ingest(&[b0, b1]), 1);
        assert_eq!(index.next_batch(), 2);

        let first = index.first_upload(&sha256(b"a")).unwrap();
        assert_eq!((first.batch_number, first.position), (0, 0));

        let actions: Vec<EventAction> =
            index.entries_for(&sha256(b"a")).iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![EventAction::Upload, EventAction::Delete, EventAction::Upload]);
        assert!(index.first_upload(&sha256(b"zzz")).is_none());
    }

    #[test]
    fn test_index_stops_at_gap() {
        let mut index = BatchIndex::new();
        assert_eq!(index.ingest(&[batch(0, &["a"]), batch(2, &["b"])]), 1);
        assert!(index.first_upload(&sha256(b"b")).is_none());

        index.clear();
        assert_eq!(index.next_batch(), 0);
        assert!(index.first_upload(&sha256(b"a")).is_none());
    }
}
