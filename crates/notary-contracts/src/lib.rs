//! # notary-contracts
//!
//! Shared types, canonical encodings, and error contracts for the record
//! notary.
//!
//! All crates in the workspace import from here. No hashing, signing, or
//! storage logic lives in this crate, only data definitions, their
//! canonical byte layouts, configuration, and error types.

pub mod audit;
pub mod batch;
pub mod config;
pub mod error;
pub mod event;
pub mod hash;
pub mod verify;

pub use hash::{Digest, SignatureBytes};
