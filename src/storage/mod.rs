//! Durable signing history.
//!
//! The arbitration engine only sees `HistoryStore`; the shipped backend is a
//! single ReDB file holding slashing history, the audit log and the network
//! binding.

pub mod redb;

pub use self::redb::Storage;

use crate::error::SignerResult;
use crate::slashing::types::{PublicKey, SigningHistory};

/// Per-account slashing protection state.
///
/// `get` returns an empty history for an account that was never written.
/// `put` must be durable when it returns `Ok`.
pub trait HistoryStore: Send + Sync {
    fn get(&self, public_key: &PublicKey) -> SignerResult<SigningHistory>;

    fn put(&self, public_key: &PublicKey, history: &SigningHistory) -> SignerResult<()>;
}
