//! Filesystem `RecordStore`: one file per object, named by its hex digest.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use notary_contracts::{
    error::{NotaryError, NotaryResult},
    Digest,
};
use notary_core::traits::RecordStore;

/// Objects live at `<root>/<64 hex chars>`.
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> NotaryResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| NotaryError::Storage {
            reason: format!("failed to create store directory '{}': {e}", root.display()),
        })?;
        info!(root = %root.display(), "filesystem record store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object with `key` is (or would be) stored at.
    pub fn object_path(&self, key: &Digest) -> PathBuf {
        self.root.join(key.to_hex())
    }

    /// Keys of every object currently on disk; unrelated files are skipped.
    pub fn keys(&self) -> NotaryResult<Vec<Digest>> {
        let entries = fs::read_dir(&self.root).map_err(|e| io_error("list", &self.root, e))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error("list", &self.root, e))?;
            if let Some(key) = entry.file_name().to_str().and_then(|n| Digest::from_hex(n).ok()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn io_error(op: &str, path: &Path, e: std::io::Error) -> NotaryError {
    NotaryError::Storage {
        reason: format!("failed to {op} '{}': {e}", path.display()),
    }
}

impl RecordStore for FsRecordStore {
    fn put(&self, key: &Digest, bytes: &[u8]) -> NotaryResult<()> {
        let path = self.object_path(key);
        // Write-then-rename so readers never see a partial object.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| io_error("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error("rename", &path, e))?;
        debug!(key = %key.short(), size = bytes.len(), "object written");
        Ok(())
    }

    fn get(&self, key: &Digest) -> NotaryResult<Option<Vec<u8>>> {
        let path = self.object_path(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, e)),
        }
    }

    fn delete(&self, key: &Digest) -> NotaryResult<bool> {
        let path = self.object_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }

    fn contains(&self, key: &Digest) -> NotaryResult<bool> {
        Ok(self.object_path(key).is_file())
    }
}
