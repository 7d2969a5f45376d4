//! Per-identity mutual exclusion.
//!
//! At most one decision per public key is in flight at any time. A second
//! request for a busy key is refused with `SignerError::Locked` immediately
//! rather than queued. Different keys never contend with each other beyond
//! the brief critical section on the in-flight set.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::error::{SignerError, SignerResult};
use crate::slashing::types::PublicKey;

#[derive(Debug, Default)]
pub struct IdentityLocks {
    in_flight: Mutex<HashSet<PublicKey>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `public_key`.
    ///
    /// The lock is released when `f` returns or panics.
    pub fn with_exclusive_access<T>(
        &self,
        public_key: &PublicKey,
        f: impl FnOnce() -> SignerResult<T>,
    ) -> SignerResult<T> {
        let _guard = self.try_acquire(public_key)?;
        f()
    }

    /// Whether a decision for `public_key` is currently in flight.
    pub fn is_held(&self, public_key: &PublicKey) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(public_key)
    }

    fn try_acquire(&self, public_key: &PublicKey) -> SignerResult<IdentityGuard<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|e| SignerError::Internal(format!("identity lock set poisoned: {e}")))?;

        if !in_flight.insert(*public_key) {
            tracing::debug!(public_key = %public_key, "Identity busy, refusing concurrent request");
            return Err(SignerError::Locked);
        }

        Ok(IdentityGuard {
            locks: self,
            public_key: *public_key,
        })
    }
}

struct IdentityGuard<'a> {
    locks: &'a IdentityLocks,
    public_key: PublicKey,
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        // Release must happen even if another holder panicked with the set locked.
        self.locks
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.public_key);
    }
}
