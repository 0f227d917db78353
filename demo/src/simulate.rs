//! Document lifecycle with tampering and silent-deletion attacks.

use std::fs;

use notary_contracts::{
    error::{NotaryError, NotaryResult},
    event::ChainedEvent,
    Digest,
};
use notary_core::traits::RecordStore;
use notary_server::{BatchOutcome, LogServer};
use notary_verify::{verify_history, Auditor, DownloadVerifier, VerifierPolicy};

use crate::deployment::Deployment;
use crate::{print_audit, print_report};

fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "-".repeat(40));
}

fn publish(server: &LogServer) -> NotaryResult<notary_contracts::batch::Batch> {
    match server.batch_and_publish()? {
        BatchOutcome::Published { batch, receipt } => {
            println!("  Batch {} published", batch.header.batch_number);
            println!("  Events in batch: {}", batch.events.len());
            println!("  Merkle root: {}", batch.header.merkle_root.short());
            println!("  Final chain hash: {}", batch.header.final_chain_hash.short());
            println!("  Acknowledged by: {}", receipt.acknowledged.join(", "));
            Ok(batch)
        }
        BatchOutcome::NoOp => Err(NotaryError::ConfigError {
            reason: "nothing pending to publish".to_string(),
        }),
    }
}

fn upload(server: &LogServer, name: &str, content: &str) -> NotaryResult<ChainedEvent> {
    let chained = server.upload(name, content.as_bytes())?;
    println!("  Uploaded {name} -> hash {}", chained.event.file_hash.short());
    Ok(chained)
}

pub fn run(deployment: &Deployment) -> NotaryResult<()> {
    deployment.reset()?;
    let key = deployment.generate_keys()?;
    let (server, store) = deployment.fresh_server(key)?;

    let verifier = DownloadVerifier::new(
        deployment.load_verifying_key()?,
        deployment.witnesses()?,
        VerifierPolicy::from(&deployment.config.witness),
    );
    let auditor = Auditor::new(deployment.witnesses()?);

    section("[1] UPLOADING THREE FILES");
    let doc1 = upload(&server, "doc1.txt", "First original document content.")?;
    let doc2 = upload(&server, "doc2.txt", "Second original document content.")?;
    let doc3 = upload(&server, "doc3.txt", "Third original document content.")?;

    section("[2] BATCHING AND PUBLISHING");
    let batch0 = publish(&server)?;

    section("[3] UPDATING FIRST DOCUMENT");
    let doc1_v2 = upload(&server, "doc1.txt", "First document content has been UPDATED.")?;
    println!("  Old hash: {}", doc1.event.file_hash.short());
    println!("  New hash: {}", doc1_v2.event.file_hash.short());
    println!("  Both versions remain in the log");

    section("[4] BATCHING UPDATE");
    let batch1 = publish(&server)?;

    section("[5] VERIFYING THIRD FILE (UNTOUCHED)");
    let doc3_hash = doc3.event.file_hash;
    let pkg = server.download(&doc3_hash)?;
    println!("  Location: {}", store.object_path(&doc3_hash).display());
    println!("  Content: '{}'", String::from_utf8_lossy(&pkg.file_content));
    print_report(&verifier.verify_download(&pkg));

    section("[6] TAMPERING ATTACK");
    let target = store.object_path(&doc3_hash);
    fs::write(&target, b"MALICIOUSLY MODIFIED CONTENT!").map_err(|e| NotaryError::Storage {
        reason: format!("tamper '{}': {e}", target.display()),
    })?;
    println!("  Overwrote {} behind the server's back", target.display());
    let tampered = server.download(&doc3_hash)?;
    let report = verifier.verify_download(&tampered);
    print_report(&report);
    println!("  Attack detected: {}", !report.passed);

    section("[7] SILENT DELETION ATTACK");
    let doc2_hash = doc2.event.file_hash;
    store.delete(&doc2_hash)?;
    println!("  Removed {} from the store without logging", doc2_hash.short());
    match server.download(&doc2_hash) {
        Err(NotaryError::NotFound { .. }) => println!("  Download failed: file not found"),
        Err(e) => return Err(e),
        Ok(_) => println!("  Download unexpectedly succeeded"),
    }
    print_audit(&auditor.audit_missing_file(&doc2_hash));

    section("[8] EVENT CHAIN SUMMARY");
    let events: [(&str, &ChainedEvent); 4] = [
        ("event 1", &doc1),
        ("event 2", &doc2),
        ("event 3", &doc3),
        ("event 4 (update)", &doc1_v2),
    ];
    println!("  Total events: {}", batch0.events.len() + batch1.events.len());
    println!("  Batches: 2");
    for (label, chained) in events {
        println!("  After {label}: {}", chained.chain_hash.short());
    }
    println!("  Final batch 0: {}", batch0.header.final_chain_hash.short());
    println!("  Final batch 1: {}", batch1.header.final_chain_hash.short());

    let (witness, history) = deployment.witnesses()?.read_canonical(0)?;
    let summary = verify_history(&history, &deployment.load_verifying_key()?)?;
    println!(
        "  History on {witness}: {} batches, {} events, head {}",
        summary.batches,
        summary.events,
        summary.chain_head.short()
    );

    let stored: Vec<Digest> = store.keys()?;
    println!();
    println!("Object store: {} files", stored.len());
    for key in stored {
        println!("  - uploads/{}", key.short());
    }
    Ok(())
}
