//! Missing-file audit over the witness histories.

use tracing::{info, warn};

use notary_contracts::{
    audit::{AuditEvidence, AuditReport, AuditVerdict},
    event::EventAction,
    Digest,
};
use notary_witness::WitnessSet;

/// Explains a file's absence from the witnesses' point of view.
///
/// The auditor never contacts the log server; it reads every witness
/// replica in full and reports what they recorded.
pub struct Auditor {
    witnesses: WitnessSet,
}

impl Auditor {
    pub fn new(witnesses: WitnessSet) -> Self {
        Self { witnesses }
    }

    /// Scan all reachable witnesses for uploads and deletes of `file_hash`.
    ///
    /// Evidence is listed per witness, so a batch held by three replicas
    /// appears three times. Unreachable witnesses are named in the report.
    pub fn audit_missing_file(&self, file_hash: &Digest) -> AuditReport {
        let readout = self.witnesses.read_all();

        let mut evidence = Vec::new();
        for (witness, batches) in &readout.reachable {
            for batch in batches {
                for (position, chained) in batch.events.iter().enumerate() {
                    if &chained.event.file_hash != file_hash {
                        continue;
                    }
                    evidence.push(AuditEvidence {
                        witness: witness.clone(),
                        batch_number: batch.header.batch_number,
                        position,
                        action: chained.event.action,
                        timestamp: chained.event.timestamp,
                    });
                }
            }
        }

        let found_upload = evidence.iter().any(|e| e.action == EventAction::Upload);
        let found_delete = evidence.iter().any(|e| e.action == EventAction::Delete);
        let verdict = AuditVerdict::classify(found_upload, found_delete);
        let unreachable_witnesses: Vec<String> =
            readout.unreachable.iter().map(|f| f.witness.clone()).collect();

        if !unreachable_witnesses.is_empty() {
            warn!(
                file_hash = %file_hash.short(),
                unreachable = ?unreachable_witnesses,
                "audit ran without every witness"
            );
        }
        if verdict == AuditVerdict::SuspectedSilentDeletion {
            warn!(file_hash = %file_hash.short(), "upload on record with no logged delete");
        } else {
            info!(file_hash = %file_hash.short(), ?verdict, "audit complete");
        }

        AuditReport {
            file_hash: *file_hash,
            found_upload,
            found_delete,
            evidence,
            unreachable_witnesses,
            verdict,
        }
    }
}
