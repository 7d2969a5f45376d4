//! Hash-chained audit log of signing decisions.
//!
//! Every accept, refusal, post-commit signer fault and history seed is
//! appended as an entry that:
//! - links to the previous entry by SHA-256 hash
//! - carries an Ed25519 signature over its canonical bytes
//!
//! `SignFailed` entries are the reconciliation trail: history was advanced
//! but no signature was returned.

use std::sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use ed25519_dalek::{SecretKey, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{SignerError, SignerResult};
use crate::slashing::types::{PublicKey, decode_hex};
use crate::storage::Storage;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    SignAccepted,
    SignRefused,
    /// History committed, signer failed afterwards.
    SignFailed,
    HistorySeeded,
    ServiceStart,
    ServiceStop,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignAccepted => write!(f, "sign_accepted"),
            Self::SignRefused => write!(f, "sign_refused"),
            Self::SignFailed => write!(f, "sign_failed"),
            Self::HistorySeeded => write!(f, "history_seeded"),
            Self::ServiceStart => write!(f, "service_start"),
            Self::ServiceStop => write!(f, "service_stop"),
        }
    }
}

/// Actor that triggered an audit event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditActor {
    /// Signing request on behalf of a validator key.
    Validator { public_key: PublicKey },
    /// Operator action (history seeding).
    Operator { public_key: PublicKey },
    /// System action (startup, shutdown).
    System,
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure { reason: String },
}

/// A single audit log entry with hash-chain linking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number, starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub actor: AuditActor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    /// SHA-256 hash of the previous entry (hex).
    pub prev_hash: String,
    /// Ed25519 signature of this entry (hex).
    pub signature: String,
}

impl AuditEntry {
    /// Canonical bytes for hashing/signing. Excludes the signature.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.seq.to_be_bytes());
        data.extend_from_slice(self.timestamp.to_rfc3339().as_bytes());
        data.extend_from_slice(self.event_type.to_string().as_bytes());
        data.extend_from_slice(
            serde_json::to_string(&self.actor)
                .unwrap_or_default()
                .as_bytes(),
        );
        if let Some(request_id) = self.request_id {
            data.extend_from_slice(request_id.as_bytes());
        }
        data.extend_from_slice(
            serde_json::to_string(&self.outcome)
                .unwrap_or_default()
                .as_bytes(),
        );
        if let Some(ref context) = self.context {
            data.extend_from_slice(context.to_string().as_bytes());
        }
        data.extend_from_slice(self.prev_hash.as_bytes());
        data
    }

    /// SHA-256 hash of this entry, signature included.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes());
        hasher.update(self.signature.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_signature(&self, verifying_key: &VerifyingKey) -> bool {
        let Ok(signature_bytes) = hex::decode(&self.signature) else {
            return false;
        };

        let Ok(signature) = ed25519_dalek::Signature::from_slice(&signature_bytes) else {
            return false;
        };

        verifying_key
            .verify(&self.canonical_bytes(), &signature)
            .is_ok()
    }
}

/// Genesis hash for the first entry in the chain.
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Audit logger with hash-chaining and signing.
pub struct AuditLogger {
    storage: Storage,
    signing_key: SigningKey,
    current_seq: AtomicU64,
    /// Serialize appends to preserve hash chain integrity.
    append_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create an audit logger with a fresh Ed25519 key.
    ///
    /// Entries written under a previous key still chain correctly, but their
    /// signatures only verify against that key.
    pub fn new(storage: Storage) -> SignerResult<Self> {
        let mut secret_key_bytes: SecretKey = [0u8; 32];
        OsRng.fill_bytes(&mut secret_key_bytes);
        Self::with_signing_key(storage, SigningKey::from_bytes(&secret_key_bytes))
    }

    pub fn with_signing_key(storage: Storage, signing_key: SigningKey) -> SignerResult<Self> {
        let current_seq = storage.get_latest_audit_seq()?.unwrap_or(0);

        Ok(Self {
            storage,
            signing_key,
            current_seq: AtomicU64::new(current_seq),
            append_lock: Mutex::new(()),
        })
    }

    /// Create an audit logger from a hex-encoded 32-byte Ed25519 seed.
    pub fn with_hex_key(storage: Storage, seed_hex: &str) -> SignerResult<Self> {
        let bytes = zeroize::Zeroizing::new(decode_hex(seed_hex)?);
        let seed: SecretKey = bytes.as_slice().try_into().map_err(|_| {
            SignerError::Config(format!(
                "audit signing key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::with_signing_key(storage, SigningKey::from_bytes(&seed))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn verifying_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    /// Append a new audit entry.
    ///
    /// Returns the sequence number of the new entry.
    pub fn append(
        &self,
        event_type: AuditEventType,
        actor: AuditActor,
        request_id: Option<Uuid>,
        outcome: AuditOutcome,
        context: Option<serde_json::Value>,
    ) -> SignerResult<u64> {
        let _append_guard = self
            .append_lock
            .lock()
            .map_err(|_e| SignerError::Storage("Audit append lock poisoned".to_string()))?;

        let seq = self.current_seq.load(Ordering::SeqCst) + 1;

        let prev_hash = if seq == 1 {
            GENESIS_HASH.to_string()
        } else {
            self.storage
                .get_audit_entry(seq - 1)?
                .map(|entry| entry.hash())
                .ok_or_else(|| SignerError::Storage(format!("Missing audit entry {}", seq - 1)))?
        };

        let mut entry = AuditEntry {
            seq,
            timestamp: Utc::now(),
            event_type,
            actor,
            request_id,
            outcome,
            context,
            prev_hash,
            signature: String::new(),
        };

        let signature = self.signing_key.sign(&entry.canonical_bytes());
        entry.signature = hex::encode(signature.to_bytes());

        self.storage.put_audit_entry(&entry)?;
        self.current_seq.store(seq, Ordering::SeqCst);

        tracing::debug!(
            seq = seq,
            event_type = %event_type,
            "Audit entry appended"
        );

        Ok(seq)
    }

    /// Verify the hash chain and signatures between two sequence numbers.
    ///
    /// Returns `Ok(false)` on the first broken link or bad signature.
    pub fn verify_chain(&self, start: u64, end: u64) -> SignerResult<bool> {
        if start == 0 || start > end {
            return Ok(false);
        }

        let verifying_key = self.verifying_key();
        let mut expected_prev_hash = if start == 1 {
            GENESIS_HASH.to_string()
        } else {
            self.storage
                .get_audit_entry(start - 1)?
                .map(|e| e.hash())
                .ok_or_else(|| SignerError::Storage(format!("Missing audit entry {}", start - 1)))?
        };

        for seq in start..=end {
            let entry = self
                .storage
                .get_audit_entry(seq)?
                .ok_or_else(|| SignerError::Storage(format!("Missing audit entry {seq}")))?;

            if entry.prev_hash != expected_prev_hash {
                tracing::warn!(
                    seq = seq,
                    expected = %expected_prev_hash,
                    actual = %entry.prev_hash,
                    "Hash chain broken"
                );
                return Ok(false);
            }

            if !entry.verify_signature(&verifying_key) {
                tracing::warn!(seq = seq, "Invalid signature on audit entry");
                return Ok(false);
            }

            expected_prev_hash = entry.hash();
        }

        Ok(true)
    }

    pub fn current_seq(&self) -> u64 {
        self.current_seq.load(Ordering::SeqCst)
    }

    pub fn get_entry(&self, seq: u64) -> SignerResult<Option<AuditEntry>> {
        self.storage.get_audit_entry(seq)
    }

    /// Entries with `start <= seq <= end`.
    pub fn list_entries(&self, start: u64, end: u64) -> SignerResult<Vec<AuditEntry>> {
        self.storage.get_audit_entries(start, end)
    }
}
