//! # notary-store
//!
//! Content-addressed record stores. Pure CRUD keyed by SHA-256 digest; the
//! stores do not check that a key matches its bytes. Integrity is the
//! verifier's job, which is what lets tampering be detected at all.

pub mod fs;
pub mod memory;

pub use fs::FsRecordStore;
pub use memory::MemoryRecordStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
