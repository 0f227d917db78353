//! The log server: the single writer of the notary.
//!
//! The server enforces the recording pipeline:
//!
//!   content → RecordStore → ChainSigner::record → accumulator
//!   accumulator → Merkle root + signed header → WitnessSet (k of N)
//!
//! Two locks keep the writer single-threaded where it matters:
//!
//! - `pending` covers `ChainSigner::record` and the accumulator append, so
//!   the signer's order and the accumulator's order are the same order.
//! - `batch_state` covers all of `batch_and_publish`, so header numbering
//!   and header chaining are never interleaved. `pending` is held only long
//!   enough to build the batch and clear the accumulator; uploads for the
//!   next batch proceed while witnesses are being written.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use notary_contracts::{
    batch::{Batch, BatchHeader},
    error::{NotaryError, NotaryResult},
    event::{ChainedEvent, Event, EventAction},
    verify::VerificationPackage,
    Digest,
};
use notary_core::{
    crypto::{genesis_hash, hash_event, hash_header, sha256, VerifyingKey},
    merkle,
    traits::{ChainSigner, RecordStore},
};
use notary_witness::{BatchIndex, PublishReceipt, WitnessSet};

/// Result of one `batch_and_publish` call.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The batch reached the publish quorum.
    Published { batch: Batch, receipt: PublishReceipt },
    /// Nothing was pending.
    NoOp,
}

impl BatchOutcome {
    pub fn batch(&self) -> Option<&Batch> {
        match self {
            BatchOutcome::Published { batch, .. } => Some(batch),
            BatchOutcome::NoOp => None,
        }
    }
}

struct BatchState {
    next_batch_number: u64,
    previous_header_hash: Digest,
    /// Built and signed but short of quorum; retried verbatim next time.
    unpublished: Option<Batch>,
}

pub struct LogServer {
    store: Arc<dyn RecordStore>,
    signer: Arc<dyn ChainSigner>,
    witnesses: WitnessSet,
    publish_quorum: usize,
    pending: Mutex<Vec<ChainedEvent>>,
    batch_state: Mutex<BatchState>,
    index: Mutex<BatchIndex>,
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

impl LogServer {
    /// Create a server for an empty witness history.
    pub fn new(
        store: Arc<dyn RecordStore>,
        signer: Arc<dyn ChainSigner>,
        witnesses: WitnessSet,
        publish_quorum: usize,
    ) -> Self {
        Self {
            store,
            signer,
            witnesses,
            publish_quorum,
            pending: Mutex::new(Vec::new()),
            batch_state: Mutex::new(BatchState {
                next_batch_number: 0,
                previous_header_hash: genesis_hash(),
                unpublished: None,
            }),
            index: Mutex::new(BatchIndex::new()),
        }
    }

    /// Create a server that continues the history already held by the
    /// witnesses: the next batch number and previous header hash are taken
    /// from the last published batch.
    pub fn resume(
        store: Arc<dyn RecordStore>,
        signer: Arc<dyn ChainSigner>,
        witnesses: WitnessSet,
        publish_quorum: usize,
    ) -> NotaryResult<Self> {
        let (witness, history) = witnesses.read_canonical(0)?;
        let server = Self::new(store, signer, witnesses, publish_quorum);

        if let Some(last) = history.last() {
            let head = server.signer.latest_hash()?;
            if head != last.header.final_chain_hash {
                warn!(
                    signer_head = %head.short(),
                    published_head = %last.header.final_chain_hash.short(),
                    "signer head differs from last published chain hash; events recorded after batch {} were never published",
                    last.header.batch_number
                );
            }
            let mut state = server.lock_batch_state()?;
            state.next_batch_number = last.header.batch_number + 1;
            state.previous_header_hash = hash_header(&last.header)?;
        }
        server.lock_index().ingest(&history);

        info!(%witness, batches = history.len(), "log server resumed from witness history");
        Ok(server)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signer.verifying_key()
    }

    pub fn witnesses(&self) -> &WitnessSet {
        &self.witnesses
    }

    /// Events recorded but not yet batched.
    pub fn pending_count(&self) -> NotaryResult<usize> {
        Ok(self.lock_pending()?.len())
    }

    /// The number the next published batch will carry.
    pub fn next_batch_number(&self) -> NotaryResult<u64> {
        Ok(self.lock_batch_state()?.next_batch_number)
    }

    // ── Upload / delete ───────────────────────────────────────────────────────

    /// Store `content` and record an upload event for it.
    ///
    /// The content is immediately downloadable but only becomes provable
    /// once the next batch is published.
    pub fn upload(&self, filename: &str, content: &[u8]) -> NotaryResult<ChainedEvent> {
        let file_hash = sha256(content);
        self.store.put(&file_hash, content)?;

        let chained = self.record(Event::upload(file_hash, filename, now_ms()))?;
        info!(
            %filename,
            file_hash = %file_hash.short(),
            chain_hash = %chained.chain_hash.short(),
            "file uploaded"
        );
        Ok(chained)
    }

    /// Remove `file_hash` from the store and record a delete event.
    ///
    /// Deleting an absent object is still logged: the event is the
    /// authoritative statement that the file is gone as of now.
    pub fn delete(&self, file_hash: &Digest, user_id: &str) -> NotaryResult<ChainedEvent> {
        let existed = self.store.delete(file_hash)?;
        if !existed {
            debug!(file_hash = %file_hash.short(), "delete of absent object recorded anyway");
        }

        let chained = self.record(Event::delete(*file_hash, user_id, now_ms()))?;
        info!(
            file_hash = %file_hash.short(),
            %user_id,
            existed,
            chain_hash = %chained.chain_hash.short(),
            "file deleted"
        );
        Ok(chained)
    }

    fn record(&self, event: Event) -> NotaryResult<ChainedEvent> {
        let mut pending = self.lock_pending()?;
        let chained = self.signer.record(event)?;
        pending.push(chained.clone());
        Ok(chained)
    }

    // ── Batching & publication ────────────────────────────────────────────────

    /// Commit every pending event into a signed batch and publish it.
    ///
    /// A batch that missed the publish quorum on an earlier call is retried
    /// first, unchanged; new events wait for the following call.
    pub fn batch_and_publish(&self) -> NotaryResult<BatchOutcome> {
        let mut state = self.lock_batch_state()?;

        if let Some(batch) = state.unpublished.take() {
            warn!(batch_number = batch.header.batch_number, "retrying publication of batch");
            return self.publish(&mut state, batch);
        }

        let batch = {
            let mut pending = self.lock_pending()?;
            if pending.is_empty() {
                debug!("no events to batch");
                return Ok(BatchOutcome::NoOp);
            }

            let final_chain_hash = self.signer.latest_hash()?;
            let last_recorded = pending.last().map(|c| c.chain_hash);
            if last_recorded != Some(final_chain_hash) {
                error!(
                    signer_head = %final_chain_hash.short(),
                    "signer head does not match the last pending event"
                );
                return Err(NotaryError::ChainStateCorruption {
                    reason: "signer advanced outside the log server's accumulator".to_string(),
                });
            }

            let leaves = pending
                .iter()
                .map(|c| hash_event(&c.event))
                .collect::<NotaryResult<Vec<_>>>()?;

            let header = BatchHeader {
                batch_number: state.next_batch_number,
                merkle_root: merkle::build_root(&leaves),
                final_chain_hash,
                previous_batch_header_hash: state.previous_header_hash,
                timestamp: now_ms(),
            };
            let signature = self.signer.sign_header(&header)?;

            Batch {
                header,
                signature,
                events: std::mem::take(&mut *pending),
            }
        };

        info!(
            batch_number = batch.header.batch_number,
            events = batch.events.len(),
            merkle_root = %batch.header.merkle_root.short(),
            final_chain_hash = %batch.header.final_chain_hash.short(),
            "batch sealed"
        );
        self.publish(&mut state, batch)
    }

    fn publish(&self, state: &mut BatchState, batch: Batch) -> NotaryResult<BatchOutcome> {
        let header_hash = hash_header(&batch.header)?;
        match self.witnesses.publish(&batch, self.publish_quorum) {
            Ok(receipt) => {
                state.next_batch_number = batch.header.batch_number + 1;
                state.previous_header_hash = header_hash;
                Ok(BatchOutcome::Published { batch, receipt })
            }
            Err(e) => {
                error!(
                    batch_number = batch.header.batch_number,
                    error = %e,
                    "batch publication short of quorum; will retry"
                );
                state.unpublished = Some(batch);
                Err(e)
            }
        }
    }

    // ── Download ──────────────────────────────────────────────────────────────

    /// Assemble a verification package for `file_hash`.
    ///
    /// Returns `NotFound` when the store lacks the object, and also when no
    /// published batch contains an upload of it yet.
    pub fn download(&self, file_hash: &Digest) -> NotaryResult<VerificationPackage> {
        let not_found = || NotaryError::NotFound {
            file_hash: file_hash.to_hex(),
        };

        let file_content = self.store.get(file_hash)?.ok_or_else(not_found)?;
        let (batch, position) = self.locate_upload(file_hash)?.ok_or_else(not_found)?;

        let leaves = batch
            .events
            .iter()
            .map(|c| hash_event(&c.event))
            .collect::<NotaryResult<Vec<_>>>()?;
        let merkle_proof = merkle::build_proof(position, &leaves)?;
        let chained = batch.events[position].clone();

        debug!(
            file_hash = %file_hash.short(),
            batch_number = batch.header.batch_number,
            position,
            "verification package assembled"
        );
        Ok(VerificationPackage {
            file_content,
            event: chained.event,
            chain_hash: chained.chain_hash,
            signature: Some(chained.signature),
            merkle_proof,
            latest_batch: batch,
        })
    }

    /// Find the first published upload of `file_hash` in log order.
    ///
    /// The index is brought up to date from the canonical witness, then the
    /// indexed batch is re-read and re-checked. A stale entry causes one
    /// full rebuild.
    fn locate_upload(&self, file_hash: &Digest) -> NotaryResult<Option<(Batch, usize)>> {
        let mut index = self.lock_index();

        for _ in 0..2 {
            let start = usize::try_from(index.next_batch()).unwrap_or(usize::MAX);
            let (_, fresh) = self.witnesses.read_canonical(start)?;
            index.ingest(&fresh);

            let Some(entry) = index.first_upload(file_hash) else {
                return Ok(None);
            };

            let position = usize::try_from(entry.batch_number).unwrap_or(usize::MAX);
            let (witness, batches) = self.witnesses.read_canonical(position)?;
            let confirmed = batches.into_iter().next().filter(|b| {
                b.header.batch_number == entry.batch_number
                    && b.events.get(entry.position).is_some_and(|c| {
                        c.event.action == EventAction::Upload && &c.event.file_hash == file_hash
                    })
            });
            if let Some(batch) = confirmed {
                return Ok(Some((batch, entry.position)));
            }

            warn!(
                %witness,
                batch_number = entry.batch_number,
                "index entry does not match witness history; rebuilding"
            );
            index.clear();
        }
        Ok(None)
    }

    // ── Locks ─────────────────────────────────────────────────────────────────

    fn lock_pending(&self) -> NotaryResult<MutexGuard<'_, Vec<ChainedEvent>>> {
        // A panic while holding this lock may have left a signed event out
        // of the accumulator.
        self.pending.lock().map_err(|e| NotaryError::ChainStateCorruption {
            reason: format!("pending accumulator lock poisoned: {e}"),
        })
    }

    fn lock_batch_state(&self) -> NotaryResult<MutexGuard<'_, BatchState>> {
        self.batch_state.lock().map_err(|e| NotaryError::ChainStateCorruption {
            reason: format!("batch state lock poisoned: {e}"),
        })
    }

    /// The index is derived data, so a poisoned lock just resets it.
    fn lock_index(&self) -> MutexGuard<'_, BatchIndex> {
        match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                guard.clear();
                guard
            }
        }
    }
}
