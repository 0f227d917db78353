//! In-memory `RecordStore`.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use notary_contracts::{
    error::{NotaryError, NotaryResult},
    Digest,
};
use notary_core::traits::RecordStore;

/// A `HashMap` of objects behind an `RwLock`; readers never block each other.
#[derive(Default)]
pub struct MemoryRecordStore {
    objects: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> NotaryResult<usize> {
        Ok(self.objects.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> NotaryResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> NotaryError {
    NotaryError::Storage {
        reason: format!("record store lock poisoned: {e}"),
    }
}

impl RecordStore for MemoryRecordStore {
    fn put(&self, key: &Digest, bytes: &[u8]) -> NotaryResult<()> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.insert(*key, bytes.to_vec());
        debug!(key = %key.short(), size = bytes.len(), "object stored");
        Ok(())
    }

    fn get(&self, key: &Digest) -> NotaryResult<Option<Vec<u8>>> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.get(key).cloned())
    }

    fn delete(&self, key: &Digest) -> NotaryResult<bool> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        Ok(objects.remove(key).is_some())
    }

    fn contains(&self, key: &Digest) -> NotaryResult<bool> {
        Ok(self.objects.read().map_err(poisoned)?.contains_key(key))
    }
}
