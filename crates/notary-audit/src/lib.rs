//! # notary-audit
//!
//! SHA-256 event chaining and the trusted chain signer.
//!
//! ## Overview
//!
//! Every upload or delete is handed to a `ChainSigner`, which links it to
//! all earlier events via the chain hash and signs it in the same step.
//! Tampering with, dropping, or reordering any recorded event breaks the
//! chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notary_audit::InMemoryChainSigner;
//! use notary_core::{crypto::genesis_hash, traits::ChainSigner};
//!
//! let signer = InMemoryChainSigner::generate();
//! let chained = signer.record(event)?;
//! assert!(notary_audit::verify_chain(&[chained], &genesis_hash()));
//! ```

pub mod chain;
pub mod signer;

pub use chain::{next_chain_hash, verify_chain};
pub use signer::InMemoryChainSigner;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use notary_contracts::{
        batch::BatchHeader,
        error::NotaryError,
        event::{ChainedEvent, Event},
    };
    use notary_core::{
        crypto::{genesis_hash, hash_event, hash_pair, sha256, verify_signature, SigningKey},
        traits::ChainSigner,
    };

    use super::{next_chain_hash, verify_chain, InMemoryChainSigner};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn signer() -> InMemoryChainSigner {
        InMemoryChainSigner::new(SigningKey::from_bytes(&[42u8; 32]))
    }

    fn upload(name: &str, ts: u64) -> Event {
        Event::upload(sha256(name.as_bytes()), name, ts)
    }

    fn record_three(s: &InMemoryChainSigner) -> Vec<ChainedEvent> {
        vec![
            s.record(upload("first", 1)).unwrap(),
            s.record(upload("second", 2)).unwrap(),
            s.record(Event::delete(sha256(b"first"), "admin", 3)).unwrap(),
        ]
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// Recording three events produces a chain that verifies from genesis.
    #[test]
    fn test_hash_chain_integrity() {
        let s = signer();
        let events = record_three(&s);
        assert!(verify_chain(&events, &genesis_hash()));
        assert_eq!(s.latest_hash().unwrap(), events[2].chain_hash);
        assert_eq!(s.recorded_count().unwrap(), 3);
    }

    /// Each chain hash is reproducible as H(H(event) || previous).
    #[test]
    fn test_chain_formula_is_reproducible() {
        let s = signer();
        let events = record_three(&s);

        let mut prev = sha256(b"genesis");
        for chained in &events {
            let expected = hash_pair(&hash_event(&chained.event).unwrap(), &prev);
            assert_eq!(chained.chain_hash, expected);
            assert_eq!(next_chain_hash(&chained.event, &prev).unwrap(), expected);
            prev = expected;
        }
    }

    /// Mutating any recorded event breaks verification.
    #[test]
    fn test_tamper_detection() {
        let s = signer();
        let mut events = record_three(&s);
        events[0].event.timestamp += 1;
        assert!(!verify_chain(&events, &genesis_hash()));
    }

    /// Dropping or reordering events breaks verification.
    #[test]
    fn test_reorder_and_drop_detection() {
        let s = signer();
        let events = record_three(&s);

        let mut swapped = events.clone();
        swapped.swap(0, 1);
        assert!(!verify_chain(&swapped, &genesis_hash()));

        assert!(!verify_chain(&events[1..], &genesis_hash()));
        assert!(verify_chain(&events[1..], &events[0].chain_hash));
    }

    /// An empty chain is trivially valid.
    #[test]
    fn test_verify_empty() {
        assert!(verify_chain(&[], &genesis_hash()));
        assert_eq!(signer().latest_hash().unwrap(), genesis_hash());
    }

    /// Event signatures cover the canonical event bytes under the public key.
    #[test]
    fn test_event_signature_verifies() {
        let s = signer();
        let chained = s.record(upload("doc", 9)).unwrap();
        let key = s.verifying_key();
        let bytes = chained.event.canonical_bytes().unwrap();
        assert!(verify_signature(&key, &bytes, &chained.signature));

        let mut other = chained.event.clone();
        other.timestamp = 10;
        assert!(!verify_signature(&key, &other.canonical_bytes().unwrap(), &chained.signature));
    }

    #[test]
    fn test_header_signature_verifies() {
        let s = signer();
        let header = BatchHeader {
            batch_number: 0,
            merkle_root: sha256(b"root"),
            final_chain_hash: genesis_hash(),
            previous_batch_header_hash: genesis_hash(),
            timestamp: 1,
        };
        let sig = s.sign_header(&header).unwrap();
        assert!(verify_signature(
            &s.verifying_key(),
            &header.canonical_bytes().unwrap(),
            &sig
        ));
    }

    /// Concurrent recorders all land in one total order with no lost links.
    #[test]
    fn test_concurrent_records_form_single_chain() {
        let s = Arc::new(signer());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    (0..25)
                        .map(|i| s.record(upload(&format!("t{t}-{i}"), i)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<ChainedEvent> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 200);

        // Reconstruct the order by following links from genesis.
        let mut ordered = Vec::with_capacity(all.len());
        let mut prev = genesis_hash();
        while !all.is_empty() {
            let pos = all
                .iter()
                .position(|c| next_chain_hash(&c.event, &prev).unwrap() == c.chain_hash)
                .expect("every event must extend the current head");
            let next = all.swap_remove(pos);
            prev = next.chain_hash;
            ordered.push(next);
        }
        assert!(verify_chain(&ordered, &genesis_hash()));
        assert_eq!(s.latest_hash().unwrap(), prev);
    }

    /// A poisoned state lock halts the signer permanently.
    #[test]
    fn test_poisoned_state_halts_signer() {
        let s = Arc::new(signer());
        let poisoner = Arc::clone(&s);
        let _ = thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("simulated crash mid-record");
        })
        .join();

        let err = s.record(upload("after", 1)).unwrap_err();
        assert!(matches!(err, NotaryError::ChainStateCorruption { .. }));
        assert!(s.is_halted());

        assert!(matches!(s.record(upload("again", 2)), Err(NotaryError::SignerHalted)));
        assert!(matches!(s.latest_hash(), Err(NotaryError::SignerHalted)));
    }

    #[test]
    fn test_resume_continues_from_head() {
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let first = InMemoryChainSigner::new(key.clone());
        let a = first.record(upload("a", 1)).unwrap();

        let resumed = InMemoryChainSigner::resume(key, a.chain_hash, 1);
        let b = resumed.record(upload("b", 2)).unwrap();
        assert!(verify_chain(&[a, b], &genesis_hash()));
        assert_eq!(resumed.recorded_count().unwrap(), 2);
    }

    #[test]
    fn test_secret_bytes_round_trip() {
        let original = InMemoryChainSigner::generate();
        let loaded = InMemoryChainSigner::from_secret_bytes(&original.secret_bytes()).unwrap();
        assert_eq!(original.verifying_key(), loaded.verifying_key());

        let err = InMemoryChainSigner::from_secret_bytes(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("expected 32"));
    }

    #[test]
    fn test_genesis_is_hash_of_marker() {
        assert_eq!(genesis_hash(), sha256(b"genesis"));
    }
}
