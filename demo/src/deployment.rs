//! File-backed deployment under a data directory:
//!
//!   <data_dir>/uploads/<hex hash>          record store
//!   <data_dir>/witness_logs/witnessN.jsonl witness replicas
//!   <data_dir>/keys/signing.key            32-byte Ed25519 secret
//!   <data_dir>/keys/verifying.key          hex public key

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use zeroize::Zeroize;

use notary_audit::InMemoryChainSigner;
use notary_contracts::{
    config::NotaryConfig,
    error::{NotaryError, NotaryResult},
};
use notary_core::{
    crypto::{genesis_hash, verifying_key_hex, SigningKey, VerifyingKey},
    traits::RecordStore,
};
use notary_server::LogServer;
use notary_store::FsRecordStore;
use notary_witness::{open_file_witnesses, WitnessSet};

pub struct Deployment {
    pub config: NotaryConfig,
}

fn io_error(what: &str, path: &Path, e: std::io::Error) -> NotaryError {
    NotaryError::Storage {
        reason: format!("{what} '{}': {e}", path.display()),
    }
}

impl Deployment {
    pub fn new(config: NotaryConfig) -> Self {
        Self { config }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.storage.data_dir
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    fn witness_dir(&self) -> PathBuf {
        self.data_dir().join("witness_logs")
    }

    fn keys_dir(&self) -> PathBuf {
        self.data_dir().join("keys")
    }

    /// Remove any previous uploads, witness logs, and keys.
    pub fn reset(&self) -> NotaryResult<()> {
        for dir in [self.uploads_dir(), self.witness_dir(), self.keys_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir).map_err(|e| io_error("remove", &dir, e))?;
            }
            fs::create_dir_all(&dir).map_err(|e| io_error("create", &dir, e))?;
        }
        Ok(())
    }

    pub fn store(&self) -> NotaryResult<Arc<FsRecordStore>> {
        Ok(Arc::new(FsRecordStore::open(self.uploads_dir())?))
    }

    pub fn witnesses(&self) -> NotaryResult<WitnessSet> {
        let logs = open_file_witnesses(&self.witness_dir(), self.config.witness.replicas)?;
        Ok(WitnessSet::new(logs, self.config.witness.timeout()))
    }

    /// Generate a fresh key pair and write both halves under `keys/`.
    pub fn generate_keys(&self) -> NotaryResult<SigningKey> {
        let signer = InMemoryChainSigner::generate();
        let mut secret = signer.secret_bytes();
        let key = SigningKey::from_bytes(&secret);

        let dir = self.keys_dir();
        fs::create_dir_all(&dir).map_err(|e| io_error("create", &dir, e))?;
        let secret_path = dir.join("signing.key");
        let written = fs::write(&secret_path, secret);
        secret.zeroize();
        written.map_err(|e| io_error("write", &secret_path, e))?;

        let public_path = dir.join("verifying.key");
        fs::write(&public_path, verifying_key_hex(&key.verifying_key()))
            .map_err(|e| io_error("write", &public_path, e))?;

        info!(public_key = %verifying_key_hex(&key.verifying_key()), "server key pair generated");
        Ok(key)
    }

    pub fn load_signing_key(&self) -> NotaryResult<SigningKey> {
        let path = self.keys_dir().join("signing.key");
        let mut bytes = fs::read(&path).map_err(|e| io_error("read", &path, e))?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(NotaryError::ConfigError {
                reason: format!("'{}' is not a 32-byte Ed25519 secret", path.display()),
            });
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&bytes);
        let key = SigningKey::from_bytes(&secret);
        secret.zeroize();
        bytes.zeroize();
        Ok(key)
    }

    /// The public half, as a verifier would receive it.
    pub fn load_verifying_key(&self) -> NotaryResult<VerifyingKey> {
        let path = self.keys_dir().join("verifying.key");
        let text = fs::read_to_string(&path).map_err(|e| io_error("read", &path, e))?;
        let invalid = |reason: String| NotaryError::ConfigError {
            reason: format!("'{}': {reason}", path.display()),
        };
        let bytes = hex::decode(text.trim()).map_err(|e| invalid(e.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| invalid("expected 32 bytes".to_string()))?;
        VerifyingKey::from_bytes(&array).map_err(|e| invalid(e.to_string()))
    }

    /// Start a server on an empty data directory.
    pub fn fresh_server(&self, key: SigningKey) -> NotaryResult<(LogServer, Arc<FsRecordStore>)> {
        let store = self.store()?;
        let server = LogServer::new(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::new(InMemoryChainSigner::new(key)),
            self.witnesses()?,
            self.config.witness.publish_quorum,
        );
        Ok((server, store))
    }

    /// Reopen the server over existing witness logs, resuming the signer at
    /// the last published chain hash.
    pub fn reopen_server(&self) -> NotaryResult<LogServer> {
        let key = self.load_signing_key()?;
        let witnesses = self.witnesses()?;
        let (_, history) = witnesses.read_canonical(0)?;

        let head = history
            .last()
            .map(|b| b.header.final_chain_hash)
            .unwrap_or_else(genesis_hash);
        let recorded = history.iter().map(|b| b.events.len() as u64).sum();
        let signer = InMemoryChainSigner::resume(key, head, recorded);

        LogServer::resume(
            self.store()?,
            Arc::new(signer),
            witnesses,
            self.config.witness.publish_quorum,
        )
    }
}
