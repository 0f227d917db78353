//! File-backed witness replica: one JSON-encoded batch per line.
//!
//! The file is opened in append mode and never truncated or rewritten. On
//! open, existing lines are hashed so the append discipline (no gaps, no
//! conflicting rewrites) survives restarts.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use notary_contracts::{
    batch::Batch,
    error::{NotaryError, NotaryResult},
    Digest,
};
use notary_core::{crypto::sha256, traits::WitnessLog};

use crate::{check_append, AppendAction};

struct FileState {
    file: File,
    /// SHA-256 of each stored line, by position.
    line_digests: Vec<Digest>,
}

pub struct FileWitness {
    id: String,
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileWitness {
    /// Open or create the log at `path`.
    pub fn open(id: impl Into<String>, path: impl Into<PathBuf>) -> NotaryResult<Self> {
        let id = id.into();
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| rejected(&id, format!("create dir: {e}")))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| rejected(&id, format!("open '{}': {e}", path.display())))?;

        let line_digests = read_lines(&id, &path)?
            .iter()
            .map(|line| sha256(line.as_bytes()))
            .collect::<Vec<_>>();

        info!(witness = %id, path = %path.display(), batches = line_digests.len(), "file witness opened");
        Ok(Self {
            id,
            path,
            state: Mutex::new(FileState { file, line_digests }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn rejected(id: &str, reason: String) -> NotaryError {
    NotaryError::WitnessRejected {
        witness: id.to_string(),
        reason,
    }
}

fn read_lines(id: &str, path: &Path) -> NotaryResult<Vec<String>> {
    let file = File::open(path).map_err(|e| rejected(id, format!("read '{}': {e}", path.display())))?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| rejected(id, format!("read line: {e}")))?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

impl WitnessLog for FileWitness {
    fn id(&self) -> &str {
        &self.id
    }

    fn append(&self, batch: &Batch) -> NotaryResult<()> {
        let line = serde_json::to_string(batch)?;
        let digest = sha256(line.as_bytes());

        let mut state = self
            .state
            .lock()
            .map_err(|e| rejected(&self.id, format!("lock poisoned: {e}")))?;

        let action = check_append(&self.id, state.line_digests.len(), batch.header.batch_number, |held| {
            state.line_digests[held] == digest
        })?;
        if action == AppendAction::AlreadyHeld {
            return Ok(());
        }

        writeln!(state.file, "{line}").map_err(|e| rejected(&self.id, format!("write: {e}")))?;
        state
            .file
            .flush()
            .and_then(|_| state.file.sync_data())
            .map_err(|e| rejected(&self.id, format!("flush: {e}")))?;
        state.line_digests.push(digest);

        debug!(witness = %self.id, batch_number = batch.header.batch_number, "batch appended to file");
        Ok(())
    }

    fn read_from(&self, start: usize) -> NotaryResult<Vec<Batch>> {
        // Held so a concurrent append is never observed half-written.
        let _state = self
            .state
            .lock()
            .map_err(|e| rejected(&self.id, format!("lock poisoned: {e}")))?;
        read_lines(&self.id, &self.path)?
            .iter()
            .skip(start)
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }
}

/// Open `replicas` file witnesses named `witness1` … `witnessN` under `dir`.
pub fn open_file_witnesses(dir: &Path, replicas: usize) -> NotaryResult<Vec<Arc<dyn WitnessLog>>> {
    (1..=replicas)
        .map(|i| {
            let witness = FileWitness::open(format!("witness{i}"), dir.join(format!("witness{i}.jsonl")))?;
            Ok(Arc::new(witness) as Arc<dyn WitnessLog>)
        })
        .collect()
}
