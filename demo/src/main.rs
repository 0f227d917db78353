//! Record Notary: Demo CLI
//!
//! Runs the document lifecycle and attack simulation against a file-backed
//! deployment, and inspects an existing one.
//!
//! Usage:
//!   cargo run -p demo -- simulate
//!   cargo run -p demo -- verify <file-hash>
//!   cargo run -p demo -- audit <file-hash>
//!   cargo run -p demo -- history
//!   cargo run -p demo -- --config notary.toml --data-dir /tmp/notary simulate

mod deployment;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notary_contracts::{
    audit::{AuditReport, AuditVerdict},
    config::NotaryConfig,
    error::NotaryResult,
    verify::VerificationReport,
    Digest,
};
use notary_verify::{cross_check_witnesses, verify_history, Auditor, DownloadVerifier, VerifierPolicy};

use deployment::Deployment;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident record notary demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Tamper-evident record notary demo",
    long_about = "Uploads, batches, and publishes records to append-only witness logs,\n\
                  then verifies downloads and audits missing files against them."
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `storage.data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reset the data directory and run the eight-step lifecycle and attack scenario.
    Simulate,
    /// Download a file from the existing deployment and run all four checks.
    Verify {
        /// Hex SHA-256 of the file content.
        file_hash: Digest,
    },
    /// Explain a missing file from the witness logs.
    Audit {
        /// Hex SHA-256 of the file content.
        file_hash: Digest,
    },
    /// Verify the full witness history and compare replicas.
    History,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        let deployment = Deployment::new(config);
        match cli.command {
            Command::Simulate => {
                print_banner();
                simulate::run(&deployment)
            }
            Command::Verify { file_hash } => run_verify(&deployment, &file_hash),
            Command::Audit { file_hash } => run_audit(&deployment, &file_hash),
            Command::History => run_history(&deployment),
        }
    });

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> NotaryResult<NotaryConfig> {
    let mut config = match &cli.config {
        Some(path) => NotaryConfig::from_file(path)?,
        None => NotaryConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    Ok(config)
}

// ── Subcommands ───────────────────────────────────────────────────────────────

fn run_verify(deployment: &Deployment, file_hash: &Digest) -> NotaryResult<()> {
    let server = deployment.reopen_server()?;
    let verifier = DownloadVerifier::new(
        deployment.load_verifying_key()?,
        deployment.witnesses()?,
        VerifierPolicy::from(&deployment.config.witness),
    );
    let pkg = server.download(file_hash)?;
    println!(
        "Downloaded {} ({} bytes) from batch {}",
        file_hash.short(),
        pkg.file_content.len(),
        pkg.latest_batch.header.batch_number
    );
    let report = verifier.verify_download(&pkg);
    print_report(&report);
    report.into_result()
}

fn run_audit(deployment: &Deployment, file_hash: &Digest) -> NotaryResult<()> {
    let auditor = Auditor::new(deployment.witnesses()?);
    print_audit(&auditor.audit_missing_file(file_hash));
    Ok(())
}

fn run_history(deployment: &Deployment) -> NotaryResult<()> {
    let witnesses = deployment.witnesses()?;
    let (witness, history) = witnesses.read_canonical(0)?;
    let summary = verify_history(&history, &deployment.load_verifying_key()?)?;
    println!(
        "{witness}: {} batches, {} events verified; chain head {}",
        summary.batches,
        summary.events,
        summary.chain_head.short()
    );

    let consistency = cross_check_witnesses(&witnesses)?;
    for (id, len) in &consistency.lengths {
        println!("  {id}: {len} batches");
    }
    for failure in &consistency.unreachable {
        println!("  {}: unreachable ({})", failure.witness, failure.reason);
    }
    for d in &consistency.divergent {
        println!("  DIVERGENT batch {}:", d.batch_number);
        for (id, hash) in &d.held {
            println!("    {id}: {}", hash.short());
        }
    }
    if consistency.is_consistent() {
        println!("Witnesses agree on every header they hold.");
    }
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

pub(crate) fn print_report(report: &VerificationReport) {
    for check in &report.checks_passed {
        println!("  [pass] {check}");
    }
    match &report.failure {
        None => println!("  Verification passed: all 4 checks"),
        Some(failure) => println!("  [FAIL] {}: {}", failure.check, failure.reason),
    }
}

pub(crate) fn print_audit(report: &AuditReport) {
    println!("  Audit of {}", report.file_hash.short());
    match report.verdict {
        AuditVerdict::SuspectedSilentDeletion => {
            println!("  Uploaded but never deleted through the log: likely deleted silently")
        }
        AuditVerdict::LoggedDeletion => println!("  Deleted through a logged operation"),
        AuditVerdict::NoRecord => println!("  No upload on record for this hash"),
    }
    for e in &report.evidence {
        println!(
            "    {} batch {} position {}: {:?} at {}",
            e.witness, e.batch_number, e.position, e.action, e.timestamp
        );
    }
    if !report.unreachable_witnesses.is_empty() {
        println!("  Unreachable witnesses: {}", report.unreachable_witnesses.join(", "));
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Record Notary: Tamper-evident Storage Demo");
    println!("==========================================");
    println!();
    println!("Per upload or delete:");
    println!("  [1] Content stored under its SHA-256 hash");
    println!("  [2] Event chained to all earlier events and signed");
    println!("Per batch:");
    println!("  [3] Events committed to a Merkle root in a signed, linked header");
    println!("  [4] Batch appended to every witness log (quorum required)");
    println!("Per download, the client checks content, signature, inclusion, and witnesses.");
}
