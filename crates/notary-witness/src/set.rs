//! Parallel fan-out over N witness replicas with a bounded wait.
//!
//! Every operation spawns one thread per replica and waits at most
//! `timeout` overall. A replica that has not answered by then is reported
//! as failed; its thread is left to finish on its own and its late answer
//! is discarded. Nothing here blocks indefinitely.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use notary_contracts::{
    batch::Batch,
    error::{NotaryError, NotaryResult},
};
use notary_core::traits::WitnessLog;

/// A replica that errored or did not answer in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessFailure {
    pub witness: String,
    pub reason: String,
}

/// Which replicas acknowledged a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub batch_number: u64,
    pub acknowledged: Vec<String>,
    pub failed: Vec<WitnessFailure>,
}

/// Histories read from every replica that answered.
#[derive(Debug, Clone)]
pub struct WitnessReadout {
    /// `(witness id, batches)` in replica declaration order.
    pub reachable: Vec<(String, Vec<Batch>)>,
    pub unreachable: Vec<WitnessFailure>,
}

#[derive(Clone)]
pub struct WitnessSet {
    witnesses: Vec<Arc<dyn WitnessLog>>,
    timeout: Duration,
}

impl WitnessSet {
    pub fn new(witnesses: Vec<Arc<dyn WitnessLog>>, timeout: Duration) -> Self {
        Self { witnesses, timeout }
    }

    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ids(&self) -> Vec<String> {
        self.witnesses.iter().map(|w| w.id().to_string()).collect()
    }

    /// Run `op` against every replica in parallel. Results come back in
    /// replica declaration order; late or failed replicas carry an error.
    pub fn fan_out<T, F>(&self, op: F) -> Vec<(String, Result<T, String>)>
    where
        T: Send + 'static,
        F: Fn(&dyn WitnessLog) -> NotaryResult<T> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let (tx, rx) = mpsc::channel();
        let mut results: Vec<Option<Result<T, String>>> = Vec::with_capacity(self.witnesses.len());

        for (idx, witness) in self.witnesses.iter().enumerate() {
            let witness = Arc::clone(witness);
            let op = Arc::clone(&op);
            let tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("witness-{}", witness.id()))
                .spawn(move || {
                    let outcome = op(witness.as_ref()).map_err(|e| e.to_string());
                    // The receiver may be gone after a timeout.
                    let _ = tx.send((idx, outcome));
                });
            results.push(match spawned {
                Ok(_) => None,
                Err(e) => Some(Err(format!("failed to spawn worker: {e}"))),
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.timeout;
        while results.iter().any(Option::is_none) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((idx, outcome)) => results[idx] = Some(outcome),
                Err(_) => break,
            }
        }

        let timeout_ms = self.timeout.as_millis();
        self.witnesses
            .iter()
            .zip(results)
            .map(|(w, r)| {
                let r = r.unwrap_or_else(|| Err(format!("no response within {timeout_ms} ms")));
                (w.id().to_string(), r)
            })
            .collect()
    }

    /// Append `batch` to every replica; succeed once `quorum` acknowledged.
    pub fn publish(&self, batch: &Batch, quorum: usize) -> NotaryResult<PublishReceipt> {
        let batch_number = batch.header.batch_number;
        let shared = Arc::new(batch.clone());
        let outcomes = self.fan_out(move |w| w.append(&shared));

        let mut acknowledged = Vec::new();
        let mut failed = Vec::new();
        for (witness, outcome) in outcomes {
            match outcome {
                Ok(()) => acknowledged.push(witness),
                Err(reason) => {
                    warn!(%witness, batch_number, %reason, "witness did not acknowledge batch");
                    failed.push(WitnessFailure { witness, reason });
                }
            }
        }

        if acknowledged.len() < quorum {
            return Err(NotaryError::WitnessUnavailable {
                reason: format!(
                    "batch {batch_number} acknowledged by {} of {} witnesses (quorum {quorum})",
                    acknowledged.len(),
                    self.witnesses.len()
                ),
            });
        }

        info!(
            batch_number,
            acknowledged = acknowledged.len(),
            replicas = self.witnesses.len(),
            "batch published to witnesses"
        );
        Ok(PublishReceipt {
            batch_number,
            acknowledged,
            failed,
        })
    }

    /// Read every replica's history from position `start`.
    pub fn read_from(&self, start: usize) -> WitnessReadout {
        let mut reachable = Vec::new();
        let mut unreachable = Vec::new();
        for (witness, outcome) in self.fan_out(move |w| w.read_from(start)) {
            match outcome {
                Ok(batches) => reachable.push((witness, batches)),
                Err(reason) => unreachable.push(WitnessFailure { witness, reason }),
            }
        }
        debug!(
            start,
            reachable = reachable.len(),
            unreachable = unreachable.len(),
            "witness histories read"
        );
        WitnessReadout {
            reachable,
            unreachable,
        }
    }

    pub fn read_all(&self) -> WitnessReadout {
        self.read_from(0)
    }

    /// History from the first replica, in declaration order, that answered.
    pub fn read_canonical(&self, start: usize) -> NotaryResult<(String, Vec<Batch>)> {
        let readout = self.read_from(start);
        readout.reachable.into_iter().next().ok_or_else(|| {
            let reasons: Vec<String> = readout
                .unreachable
                .iter()
                .map(|f| format!("{}: {}", f.witness, f.reason))
                .collect();
            NotaryError::WitnessUnavailable {
                reason: format!("no witness reachable ({})", reasons.join("; ")),
            }
        })
    }
}
