//! # notary-core
//!
//! Capability traits, hash/sign primitives, and the Merkle engine shared by
//! the notary server and its verifiers.
//!
//! This crate provides:
//! - The three capability traits (`ChainSigner`, `RecordStore`, `WitnessLog`)
//! - SHA-256 / Ed25519 helpers over the canonical encodings
//! - `merkle::{build_root, build_proof, verify_proof}`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notary_core::{merkle, traits::{ChainSigner, RecordStore, WitnessLog}};
//!
//! let root = merkle::build_root(&leaf_hashes);
//! let proof = merkle::build_proof(2, &leaf_hashes)?;
//! assert!(merkle::verify_proof(&leaf_hashes[2], &proof, &root));
//! ```

pub mod crypto;
pub mod merkle;
pub mod traits;
