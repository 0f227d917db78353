//! Missing-file audit results.
//!
//! Audit output is informational. Absence of evidence across the reachable
//! witnesses is reported as such and never treated as proof of an honest
//! deletion.

use serde::{Deserialize, Serialize};

use crate::{event::EventAction, hash::Digest};

/// One logged event touching the audited file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvidence {
    pub witness: String,
    pub batch_number: u64,
    pub position: usize,
    pub action: EventAction,
    pub timestamp: u64,
}

/// How the witness history explains a file's absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditVerdict {
    /// Uploaded but never deleted through the log.
    SuspectedSilentDeletion,
    /// Uploaded and later deleted through the log.
    LoggedDeletion,
    /// No upload on record: never uploaded, or the log itself is incomplete.
    NoRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub file_hash: Digest,
    pub found_upload: bool,
    pub found_delete: bool,
    pub evidence: Vec<AuditEvidence>,
    /// Witnesses that could not be read in time.
    pub unreachable_witnesses: Vec<String>,
    pub verdict: AuditVerdict,
}

impl AuditVerdict {
    pub fn classify(found_upload: bool, found_delete: bool) -> Self {
        match (found_upload, found_delete) {
            (true, false) => AuditVerdict::SuspectedSilentDeletion,
            (true, true) => AuditVerdict::LoggedDeletion,
            (false, _) => AuditVerdict::NoRecord,
        }
    }
}
