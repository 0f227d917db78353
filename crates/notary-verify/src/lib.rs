//! # notary-verify
//!
//! Read-only checks a client or auditor runs against the notary.
//!
//! - `DownloadVerifier`: the four-check download protocol.
//! - `Auditor`: explains a missing file from the witness histories.
//! - `verify_history` / `cross_check_witnesses`: whole-log consistency.
//!
//! None of these trust the log server. They need the server's verifying key
//! and read access to the witnesses.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notary_verify::{DownloadVerifier, VerifierPolicy};
//!
//! let verifier = DownloadVerifier::new(server_key, witnesses, VerifierPolicy::from(&config.witness));
//! let report = verifier.verify_download(&package);
//! report.into_result()?;
//! ```

pub mod auditor;
pub mod engine;
pub mod history;

pub use auditor::Auditor;
pub use engine::{DownloadVerifier, VerifierPolicy};
pub use history::{cross_check_witnesses, verify_history, ConsistencyReport, Divergence, HistorySummary};

// ── Tests ─────────────────────────────────────────────────────────────────────
