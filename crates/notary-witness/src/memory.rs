//! In-memory witness replica.

use std::sync::RwLock;

use tracing::debug;

use notary_contracts::{
    batch::Batch,
    error::{NotaryError, NotaryResult},
};
use notary_core::traits::WitnessLog;

use crate::{check_append, AppendAction};

pub struct MemoryWitness {
    id: String,
    batches: RwLock<Vec<Batch>>,
}

impl MemoryWitness {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            batches: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> NotaryResult<usize> {
        Ok(self.batches.read().map_err(|e| self.poisoned(e))?.len())
    }

    pub fn is_empty(&self) -> NotaryResult<bool> {
        Ok(self.len()? == 0)
    }

    fn poisoned<E: std::fmt::Display>(&self, e: E) -> NotaryError {
        NotaryError::WitnessRejected {
            witness: self.id.clone(),
            reason: format!("lock poisoned: {e}"),
        }
    }
}

impl WitnessLog for MemoryWitness {
    fn id(&self) -> &str {
        &self.id
    }

    fn append(&self, batch: &Batch) -> NotaryResult<()> {
        let mut batches = self.batches.write().map_err(|e| self.poisoned(e))?;
        let action = check_append(&self.id, batches.len(), batch.header.batch_number, |held| {
            batches[held] == *batch
        })?;
        if action == AppendAction::Append {
            batches.push(batch.clone());
            debug!(witness = %self.id, batch_number = batch.header.batch_number, "batch appended");
        }
        Ok(())
    }

    fn read_from(&self, start: usize) -> NotaryResult<Vec<Batch>> {
        let batches = self.batches.read().map_err(|e| self.poisoned(e))?;
        Ok(batches.iter().skip(start).cloned().collect())
    }
}
