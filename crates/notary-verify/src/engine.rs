//! Client-side download verifier.
//!
//! `DownloadVerifier` runs the four checks against a `VerificationPackage`
//! in protocol order and stops at the first failure:
//!
//! 1. **Content integrity**: the bytes hash to `event.file_hash`.
//! 2. **Event authenticity**: the event carries a valid server signature.
//! 3. **Batch inclusion**: the batch header is server-signed, the proof's
//!    leaf index addresses this exact event, and the Merkle proof reaches
//!    the header's root.
//! 4. **Witness availability**: enough independent witnesses, reached
//!    within the timeout, hold the same header for that batch number.
//!
//! Nothing in the package is trusted beyond what these checks establish.

use tracing::{debug, warn};

use notary_contracts::{
    config::WitnessConfig,
    verify::{VerificationCheck, VerificationFailure, VerificationPackage, VerificationReport},
    Digest,
};
use notary_core::{
    crypto::{hash_event, hash_header, sha256, verify_signature, VerifyingKey},
    merkle,
};
use notary_witness::WitnessSet;

/// How much witness agreement check 4 demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierPolicy {
    /// Witnesses that must hold an identical header.
    pub read_quorum: usize,
    /// Fail if any reachable witness holds a different header for the batch.
    pub require_agreement: bool,
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            read_quorum: 1,
            require_agreement: false,
        }
    }
}

impl From<&WitnessConfig> for VerifierPolicy {
    fn from(config: &WitnessConfig) -> Self {
        Self {
            read_quorum: config.read_quorum,
            require_agreement: config.require_agreement,
        }
    }
}

type CheckResult = Result<(), String>;

pub struct DownloadVerifier {
    server_key: VerifyingKey,
    witnesses: WitnessSet,
    policy: VerifierPolicy,
}

impl DownloadVerifier {
    pub fn new(server_key: VerifyingKey, witnesses: WitnessSet, policy: VerifierPolicy) -> Self {
        Self {
            server_key,
            witnesses,
            policy,
        }
    }

    pub fn policy(&self) -> VerifierPolicy {
        self.policy
    }

    /// Run all four checks. The report lists the checks that passed and, on
    /// failure, the first one that did not.
    pub fn verify_download(&self, pkg: &VerificationPackage) -> VerificationReport {
        const ORDER: [VerificationCheck; 4] = [
            VerificationCheck::ContentIntegrity,
            VerificationCheck::EventAuthenticity,
            VerificationCheck::BatchInclusion,
            VerificationCheck::WitnessAvailability,
        ];

        let mut checks_passed = Vec::with_capacity(ORDER.len());
        for check in ORDER {
            let outcome = match check {
                VerificationCheck::ContentIntegrity => self.check_content(pkg),
                VerificationCheck::EventAuthenticity => self.check_event_signature(pkg),
                VerificationCheck::BatchInclusion => self.check_inclusion(pkg),
                VerificationCheck::WitnessAvailability => self.check_witnesses(pkg),
            };
            if let Err(reason) = outcome {
                warn!(
                    file_hash = %pkg.event.file_hash.short(),
                    %check,
                    %reason,
                    "download verification failed"
                );
                return VerificationReport {
                    passed: false,
                    checks_passed,
                    failure: Some(VerificationFailure { check, reason }),
                };
            }
            debug!(file_hash = %pkg.event.file_hash.short(), %check, "passed");
            checks_passed.push(check);
        }

        VerificationReport {
            passed: true,
            checks_passed,
            failure: None,
        }
    }

    // ── Check 1 ───────────────────────────────────────────────────────────────

    fn check_content(&self, pkg: &VerificationPackage) -> CheckResult {
        let actual = sha256(&pkg.file_content);
        if actual != pkg.event.file_hash {
            return Err(format!(
                "content hashes to {} but event records {}",
                actual.short(),
                pkg.event.file_hash.short()
            ));
        }
        Ok(())
    }

    // ── Check 2 ───────────────────────────────────────────────────────────────

    fn check_event_signature(&self, pkg: &VerificationPackage) -> CheckResult {
        let signature = match &pkg.signature {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err("event signature missing".to_string()),
        };
        let message = pkg
            .event
            .canonical_bytes()
            .map_err(|e| format!("cannot encode event: {e}"))?;
        if !verify_signature(&self.server_key, &message, signature) {
            return Err("event signature does not verify under the server key".to_string());
        }
        Ok(())
    }

    // ── Check 3 ───────────────────────────────────────────────────────────────

    fn check_inclusion(&self, pkg: &VerificationPackage) -> CheckResult {
        let batch = &pkg.latest_batch;
        let header = &batch.header;

        let header_bytes = header
            .canonical_bytes()
            .map_err(|e| format!("cannot encode batch header: {e}"))?;
        if !verify_signature(&self.server_key, &header_bytes, &batch.signature) {
            return Err(format!(
                "batch {} header signature does not verify under the server key",
                header.batch_number
            ));
        }

        let leaf = hash_event(&pkg.event).map_err(|e| format!("cannot hash event: {e}"))?;
        let index = pkg.merkle_proof.leaf_index;
        let committed = batch
            .events
            .get(index)
            .ok_or_else(|| format!("proof leaf index {index} outside batch of {}", batch.events.len()))?;
        let committed_hash =
            hash_event(&committed.event).map_err(|e| format!("cannot hash committed event: {e}"))?;
        if committed_hash != leaf {
            return Err(format!(
                "event at position {index} of batch {} is not the downloaded event",
                header.batch_number
            ));
        }

        if !merkle::verify_proof(&leaf, &pkg.merkle_proof, &header.merkle_root) {
            return Err(format!(
                "Merkle proof does not reach root {} of batch {}",
                header.merkle_root.short(),
                header.batch_number
            ));
        }
        Ok(())
    }

    // ── Check 4 ───────────────────────────────────────────────────────────────

    fn check_witnesses(&self, pkg: &VerificationPackage) -> CheckResult {
        let header = &pkg.latest_batch.header;
        let expected = hash_header(header).map_err(|e| format!("cannot hash batch header: {e}"))?;
        let start = usize::try_from(header.batch_number).map_err(|e| e.to_string())?;

        let readout = self.witnesses.read_from(start);
        let mut agreeing = Vec::new();
        let mut conflicting = Vec::new();
        let mut missing = Vec::new();

        for (witness, batches) in &readout.reachable {
            let held: Option<Digest> = batches
                .first()
                .filter(|b| b.header.batch_number == header.batch_number)
                .and_then(|b| hash_header(&b.header).ok());
            match held {
                Some(h) if h == expected => agreeing.push(witness.as_str()),
                Some(_) => conflicting.push(witness.as_str()),
                None => missing.push(witness.as_str()),
            }
        }

        if self.policy.require_agreement && !conflicting.is_empty() {
            return Err(format!(
                "witnesses [{}] hold a different header for batch {}",
                conflicting.join(", "),
                header.batch_number
            ));
        }

        if agreeing.len() < self.policy.read_quorum {
            let unreachable: Vec<String> = readout
                .unreachable
                .iter()
                .map(|f| format!("{}: {}", f.witness, f.reason))
                .collect();
            return Err(format!(
                "batch {} confirmed by {} of {} witnesses (quorum {}); missing [{}], conflicting [{}], unreachable [{}]",
                header.batch_number,
                agreeing.len(),
                self.witnesses.len(),
                self.policy.read_quorum,
                missing.join(", "),
                conflicting.join(", "),
                unreachable.join("; ")
            ));
        }
        Ok(())
    }
}
