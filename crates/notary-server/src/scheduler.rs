//! Periodic batching on a background thread.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use notary_contracts::error::{NotaryError, NotaryResult};

use crate::server::{BatchOutcome, LogServer};

/// Calls `LogServer::batch_and_publish` every `interval` until stopped.
///
/// Publication failures are logged and retried on the next tick. A signer
/// fault ends the loop, since every later batch would fail the same way.
pub struct BatchScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BatchScheduler {
    pub fn start(server: Arc<LogServer>, interval: Duration) -> NotaryResult<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("batch-scheduler".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "batch scheduler started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    match server.batch_and_publish() {
                        Ok(BatchOutcome::Published { batch, .. }) => {
                            debug!(batch_number = batch.header.batch_number, "scheduled batch published");
                        }
                        Ok(BatchOutcome::NoOp) => {}
                        Err(e @ (NotaryError::ChainStateCorruption { .. } | NotaryError::SignerHalted)) => {
                            error!(error = %e, "batch scheduler stopping on signer fault");
                            break;
                        }
                        Err(e) => error!(error = %e, "scheduled batch failed"),
                    }
                }
                info!("batch scheduler stopped");
            })
            .map_err(|e| NotaryError::ConfigError {
                reason: format!("failed to spawn batch scheduler: {e}"),
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it. An in-flight batch completes first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the loop.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("batch scheduler thread panicked");
            }
        }
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
