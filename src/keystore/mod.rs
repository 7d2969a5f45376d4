//! Validator accounts managed by this signer.
//!
//! Keys are read once at startup from a JSON key file and held in memory for
//! the life of the process. Nothing here creates, rotates or deletes keys.
//!
//! Key file format:
//!
//! ```json
//! { "keys": ["<hex secret key>", "..."] }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use blst::min_pk::SecretKey;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{SignerError, SignerResult};
use crate::slashing::types::{PublicKey, decode_hex};

/// Opaque handle to one validator's key material.
///
/// Cloning shares the same secret; the secret is zeroized when the last handle
/// is dropped.
#[derive(Clone)]
pub struct KeyHandle {
    public_key: PublicKey,
    secret: Arc<SecretKey>,
}

impl KeyHandle {
    /// Build a handle from a 32-byte big-endian BLS secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> SignerResult<Self> {
        let secret = SecretKey::from_bytes(bytes)
            .map_err(|e| SignerError::InvalidInput(format!("invalid BLS secret key: {e:?}")))?;
        let public_key = PublicKey(secret.sk_to_pk().to_bytes());
        Ok(Self {
            public_key,
            secret: Arc::new(secret),
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Maps a public key to the key handle the signer needs.
pub trait AccountResolver: Send + Sync {
    fn resolve(&self, public_key: &PublicKey) -> Option<KeyHandle>;

    /// All managed public keys, in a stable order.
    fn public_keys(&self) -> Vec<PublicKey>;
}

#[derive(Deserialize)]
struct KeyFile {
    keys: Vec<Zeroizing<String>>,
}

/// In-memory key store.
#[derive(Default)]
pub struct KeyStore {
    keys: HashMap<PublicKey, KeyHandle>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-constructed handles.
    pub fn with_keys(handles: impl IntoIterator<Item = KeyHandle>) -> Self {
        let keys = handles
            .into_iter()
            .map(|handle| (handle.public_key, handle))
            .collect();
        Self { keys }
    }

    /// Load every key in the key file. Any malformed key fails the whole load:
    /// a signer silently missing a validator is worse than one that refuses to
    /// start.
    pub fn load(path: &Path) -> SignerResult<Self> {
        check_key_permissions(path);

        let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            SignerError::Config(format!("failed to read key file {}: {e}", path.display()))
        })?);
        let file: KeyFile = serde_json::from_str(&raw)
            .map_err(|e| SignerError::Config(format!("invalid key file: {e}")))?;

        let mut store = Self::new();
        for (index, encoded) in file.keys.iter().enumerate() {
            let bytes = Zeroizing::new(decode_hex(encoded).map_err(|e| {
                SignerError::Config(format!("key {index} in key file: {e}"))
            })?);
            let handle = KeyHandle::from_secret_bytes(&bytes)
                .map_err(|e| SignerError::Config(format!("key {index} in key file: {e}")))?;
            if store.keys.insert(handle.public_key, handle).is_some() {
                tracing::warn!(index, "Duplicate key in key file ignored");
            }
        }

        tracing::info!(
            path = %path.display(),
            accounts = store.keys.len(),
            "Loaded validator keys"
        );

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl AccountResolver for KeyStore {
    fn resolve(&self, public_key: &PublicKey) -> Option<KeyHandle> {
        self.keys.get(public_key).cloned()
    }

    fn public_keys(&self) -> Vec<PublicKey> {
        let mut keys: Vec<PublicKey> = self.keys.keys().copied().collect();
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        keys
    }
}

/// Warn when the key file is readable by group or others.
#[cfg(unix)]
pub fn check_key_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o044 != 0 {
            tracing::warn!(
                path = %path.display(),
                mode = format!("{mode:o}"),
                "Key file has overly permissive permissions. \
                 Consider running: chmod 600 {}",
                path.display()
            );
        }
    }
}

#[cfg(not(unix))]
pub fn check_key_permissions(_path: &Path) {}
