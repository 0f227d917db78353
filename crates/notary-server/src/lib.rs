//! # notary-server
//!
//! The log server: the only component that writes to the record store, the
//! chain signer, and the witness logs.
//!
//! - `LogServer` handles upload, delete, batching, and download.
//! - `BatchScheduler` drives `batch_and_publish` on a fixed interval.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notary_server::LogServer;
//!
//! let server = LogServer::new(store, signer, witnesses, config.witness.publish_quorum);
//! let chained = server.upload("report.pdf", &bytes)?;
//! server.batch_and_publish()?;
//! let package = server.download(&chained.event.file_hash)?;
//! ```

pub mod scheduler;
pub mod server;

pub use scheduler::BatchScheduler;
pub use server::{BatchOutcome, LogServer};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use notary_audit::InMemoryChainSigner;
    use notary_contracts::{
        batch::Batch,
        error::{NotaryError, NotaryResult},
        event::EventAction,
    };
    use notary_core::{
        crypto::{genesis_hash, hash_event, hash_header, sha256, SigningKey},
        merkle,
        traits::{ChainSigner, RecordStore, WitnessLog},
    };
    use notary_store::MemoryRecordStore;
    use notary_witness::{MemoryWitness, WitnessSet};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A memory witness that can be switched off.
    struct SwitchWitness {
        inner: MemoryWitness,
        up: AtomicBool,
    }

    impl SwitchWitness {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryWitness::new(id),
                up: AtomicBool::new(true),
            })
        }

        fn set_up(&self, up: bool) {
            self.up.store(up, Ordering::SeqCst);
        }

        fn check(&self) -> NotaryResult<()> {
            if self.up.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(NotaryError::WitnessRejected {
                    witness: self.inner.id().to_string(),
                    reason: "offline".to_string(),
                })
            }
        }
    }

    impl WitnessLog for SwitchWitness {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn append(&self, batch: &Batch) -> NotaryResult<()> {
            self.check()?;
            self.inner.append(batch)
        }
        fn read_from(&self, start: usize) -> NotaryResult<Vec<Batch>> {
            self.check()?;
            self.inner.read_from(start)
        }
    }

    struct Fixture {
        server: LogServer,
        store: Arc<MemoryRecordStore>,
        witnesses: Vec<Arc<SwitchWitness>>,
        key: SigningKey,
    }

    fn witness_set(witnesses: &[Arc<SwitchWitness>]) -> WitnessSet {
        let logs = witnesses
            .iter()
            .map(|w| Arc::clone(w) as Arc<dyn WitnessLog>)
            .collect();
        WitnessSet::new(logs, Duration::from_millis(500))
    }

    fn fixture(quorum: usize) -> Fixture {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let store = Arc::new(MemoryRecordStore::new());
        let witnesses: Vec<_> = (1..=3).map(|i| SwitchWitness::new(&format!("witness{i}"))).collect();
        let server = LogServer::new(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::new(InMemoryChainSigner::new(key.clone())),
            witness_set(&witnesses),
            quorum,
        );
        Fixture {
            server,
            store,
            witnesses,
            key,
        }
    }

    fn published(outcome: BatchOutcome) -> Batch {
        match outcome {
            BatchOutcome::Published { batch, .. } => batch,
            BatchOutcome::NoOp => panic!("expected a published batch"),
        }
    }

    // ── Upload / delete ───────────────────────────────────────────────────────

    #[test]
    fn upload_stores_content_and_records_event() {
        let f = fixture(3);
        let chained = f.server.upload("a.txt", b"alpha").expect("upload");

        assert_eq!(chained.event.action, EventAction::Upload);
        assert_eq!(chained.event.file_hash, sha256(b"alpha"));
        assert_eq!(f.store.get(&sha256(b"alpha")).unwrap(), Some(b"alpha".to_vec()));
        assert_eq!(f.server.pending_count().unwrap(), 1);
    }

    #[test]
    fn delete_removes_content_and_records_event() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        let chained = f.server.delete(&sha256(b"alpha"), "alice").expect("delete");

        assert_eq!(chained.event.action, EventAction::Delete);
        assert!(!f.store.contains(&sha256(b"alpha")).unwrap());
        assert_eq!(f.server.pending_count().unwrap(), 2);
    }

    #[test]
    fn delete_of_absent_file_is_still_logged() {
        let f = fixture(3);
        f.server.delete(&sha256(b"never"), "alice").expect("delete");
        assert_eq!(f.server.pending_count().unwrap(), 1);
    }

    // ── Batching ──────────────────────────────────────────────────────────────

    #[test]
    fn batch_with_nothing_pending_is_noop() {
        let f = fixture(3);
        assert!(matches!(f.server.batch_and_publish().unwrap(), BatchOutcome::NoOp));
        assert_eq!(f.server.next_batch_number().unwrap(), 0);
        assert!(f.witnesses[0].inner.is_empty().unwrap());
    }

    #[test]
    fn batches_are_numbered_and_linked() {
        let f = fixture(3);
        let first = f.server.upload("a.txt", b"alpha").unwrap();
        let b0 = published(f.server.batch_and_publish().unwrap());
        let second = f.server.upload("b.txt", b"beta").unwrap();
        let b1 = published(f.server.batch_and_publish().unwrap());

        assert_eq!(b0.header.batch_number, 0);
        assert_eq!(b0.header.previous_batch_header_hash, genesis_hash());
        assert_eq!(b0.header.final_chain_hash, first.chain_hash);
        assert_eq!(b1.header.batch_number, 1);
        assert_eq!(b1.header.previous_batch_header_hash, hash_header(&b0.header).unwrap());
        assert_eq!(b1.header.final_chain_hash, second.chain_hash);
        assert_eq!(f.server.pending_count().unwrap(), 0);

        for w in &f.witnesses {
            assert_eq!(w.inner.len().unwrap(), 2);
        }
    }

    #[test]
    fn batch_root_and_signature_cover_events() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.upload("b.txt", b"beta").unwrap();
        f.server.upload("c.txt", b"gamma").unwrap();
        let batch = published(f.server.batch_and_publish().unwrap());

        let leaves: Vec<_> = batch.events.iter().map(|c| hash_event(&c.event).unwrap()).collect();
        assert_eq!(batch.header.merkle_root, merkle::build_root(&leaves));

        let verifying = f.key.verifying_key();
        let message = batch.header.canonical_bytes().unwrap();
        assert!(notary_core::crypto::verify_signature(&verifying, &message, &batch.signature));
    }

    #[test]
    fn missed_quorum_retries_same_batch() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.witnesses[2].set_up(false);

        let err = f.server.batch_and_publish().expect_err("quorum of 3 not met");
        assert!(matches!(err, NotaryError::WitnessUnavailable { .. }));
        assert_eq!(f.server.next_batch_number().unwrap(), 0);

        // New events wait for the batch after the retried one.
        f.server.upload("b.txt", b"beta").unwrap();
        f.witnesses[2].set_up(true);

        let retried = published(f.server.batch_and_publish().unwrap());
        assert_eq!(retried.header.batch_number, 0);
        assert_eq!(retried.events.len(), 1);

        let next = published(f.server.batch_and_publish().unwrap());
        assert_eq!(next.header.batch_number, 1);
        assert_eq!(next.events[0].event.file_hash, sha256(b"beta"));
        for w in &f.witnesses {
            assert_eq!(w.inner.len().unwrap(), 2);
        }
    }

    #[test]
    fn lower_quorum_tolerates_one_offline_witness() {
        let f = fixture(2);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.witnesses[0].set_up(false);

        match f.server.batch_and_publish().unwrap() {
            BatchOutcome::Published { receipt, .. } => {
                assert_eq!(receipt.acknowledged.len(), 2);
                assert_eq!(receipt.failed.len(), 1);
                assert_eq!(receipt.failed[0].witness, "witness1");
            }
            BatchOutcome::NoOp => panic!("expected publication"),
        }
    }

    #[test]
    fn signer_used_outside_server_is_detected() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let signer = Arc::new(InMemoryChainSigner::new(key));
        let witnesses: Vec<_> = (1..=3).map(|i| SwitchWitness::new(&format!("witness{i}"))).collect();
        let server = LogServer::new(
            Arc::new(MemoryRecordStore::new()),
            Arc::clone(&signer) as Arc<dyn ChainSigner>,
            witness_set(&witnesses),
            3,
        );

        server.upload("a.txt", b"alpha").unwrap();
        signer
            .record(notary_contracts::event::Event::upload(sha256(b"x"), "x", 0))
            .unwrap();

        let err = server.batch_and_publish().expect_err("head mismatch");
        assert!(matches!(err, NotaryError::ChainStateCorruption { .. }));
    }

    // ── Download ──────────────────────────────────────────────────────────────

    #[test]
    fn download_before_batching_is_not_found() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        let err = f.server.download(&sha256(b"alpha")).expect_err("not yet batched");
        assert!(matches!(err, NotaryError::NotFound { .. }));
    }

    #[test]
    fn download_of_unknown_file_is_not_found() {
        let f = fixture(3);
        let err = f.server.download(&sha256(b"nothing")).expect_err("unknown");
        assert!(matches!(err, NotaryError::NotFound { .. }));
    }

    #[test]
    fn download_after_batching_carries_valid_proof() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.upload("b.txt", b"beta").unwrap();
        f.server.upload("c.txt", b"gamma").unwrap();
        f.server.batch_and_publish().unwrap();

        let pkg = f.server.download(&sha256(b"beta")).expect("download");
        assert_eq!(pkg.file_content, b"beta".to_vec());
        assert_eq!(pkg.event.file_hash, sha256(b"beta"));
        assert_eq!(pkg.merkle_proof.leaf_index, 1);
        assert!(pkg.signature.is_some());

        let leaf = hash_event(&pkg.event).unwrap();
        assert!(merkle::verify_proof(&leaf, &pkg.merkle_proof, &pkg.latest_batch.header.merkle_root));
    }

    #[test]
    fn download_finds_upload_in_earlier_batch() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.batch_and_publish().unwrap();
        f.server.upload("b.txt", b"beta").unwrap();
        f.server.batch_and_publish().unwrap();

        let pkg = f.server.download(&sha256(b"alpha")).unwrap();
        assert_eq!(pkg.latest_batch.header.batch_number, 0);
        let pkg = f.server.download(&sha256(b"beta")).unwrap();
        assert_eq!(pkg.latest_batch.header.batch_number, 1);
    }

    #[test]
    fn download_after_delete_is_not_found() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.batch_and_publish().unwrap();
        f.server.delete(&sha256(b"alpha"), "alice").unwrap();

        let err = f.server.download(&sha256(b"alpha")).expect_err("deleted");
        assert!(matches!(err, NotaryError::NotFound { .. }));
    }

    #[test]
    fn download_falls_back_to_next_reachable_witness() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.batch_and_publish().unwrap();
        f.witnesses[0].set_up(false);

        let pkg = f.server.download(&sha256(b"alpha")).expect("second witness serves");
        assert_eq!(pkg.latest_batch.header.batch_number, 0);
    }

    #[test]
    fn download_with_every_witness_down_is_unavailable() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.batch_and_publish().unwrap();
        for w in &f.witnesses {
            w.set_up(false);
        }
        let err = f.server.download(&sha256(b"alpha")).expect_err("no witness");
        assert!(matches!(err, NotaryError::WitnessUnavailable { .. }));
    }

    // ── Resume ────────────────────────────────────────────────────────────────

    #[test]
    fn resume_continues_numbering_and_linkage() {
        let f = fixture(3);
        f.server.upload("a.txt", b"alpha").unwrap();
        f.server.batch_and_publish().unwrap();
        f.server.upload("b.txt", b"beta").unwrap();
        let b1 = published(f.server.batch_and_publish().unwrap());

        let signer = InMemoryChainSigner::resume(f.key.clone(), b1.header.final_chain_hash, 2);
        let resumed = LogServer::resume(
            Arc::clone(&f.store) as Arc<dyn RecordStore>,
            Arc::new(signer),
            witness_set(&f.witnesses),
            3,
        )
        .expect("resume");
        assert_eq!(resumed.next_batch_number().unwrap(), 2);

        resumed.upload("c.txt", b"gamma").unwrap();
        let b2 = published(resumed.batch_and_publish().unwrap());
        assert_eq!(b2.header.batch_number, 2);
        assert_eq!(b2.header.previous_batch_header_hash, hash_header(&b1.header).unwrap());

        assert!(resumed.download(&sha256(b"alpha")).is_ok());
    }

    // ── Scheduler ─────────────────────────────────────────────────────────────

    #[test]
    fn scheduler_publishes_pending_events() {
        let f = fixture(3);
        let server = Arc::new(f.server);
        server.upload("a.txt", b"alpha").unwrap();

        let scheduler = BatchScheduler::start(Arc::clone(&server), Duration::from_millis(20)).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while server.next_batch_number().unwrap() == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        scheduler.stop();

        assert_eq!(server.next_batch_number().unwrap(), 1);
        assert_eq!(server.pending_count().unwrap(), 0);
    }
}
