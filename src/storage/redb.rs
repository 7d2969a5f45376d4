//! ReDB storage implementation for the signer service.
//!
//! Tables:
//! - `slashing_history`: public key (hex) to JSON `SigningHistory`
//! - `audit_log`: sequence number to JSON `AuditEntry`
//! - `metadata`: database-level settings (the bound network)

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::audit::AuditEntry;
use crate::chain::Network;
use crate::error::{SignerError, SignerResult};
use crate::slashing::types::{PublicKey, SigningHistory};
use crate::storage::HistoryStore;

const SLASHING_HISTORY: TableDefinition<&str, &[u8]> = TableDefinition::new("slashing_history");
const AUDIT_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");

const NETWORK_KEY: &str = "network";

/// Storage wrapper for ReDB.
///
/// Thread-safe via internal Arc. Clone is cheap.
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl Storage {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(path: &Path) -> SignerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(|e| SignerError::Storage(e.to_string()))?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;

        tracing::info!(path = %path.display(), "Opened storage database");

        Ok(storage)
    }

    /// Open an in-memory database for testing.
    #[cfg(test)]
    pub fn open_memory() -> SignerResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| SignerError::Storage(e.to_string()))?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> SignerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            // Opening a table creates it
            let _ = write_txn.open_table(SLASHING_HISTORY)?;
            let _ = write_txn.open_table(AUDIT_LOG)?;
            let _ = write_txn.open_table(METADATA)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Slashing history
    // =========================================================================

    /// Stored history for `public_key`, or `None` if never written.
    pub fn get_history(&self, public_key: &PublicKey) -> SignerResult<Option<SigningHistory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SLASHING_HISTORY)?;

        match table.get(public_key.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Durably replace the history for `public_key`.
    pub fn put_history(&self, public_key: &PublicKey, history: &SigningHistory) -> SignerResult<()> {
        let value = serde_json::to_vec(history)?;
        let key = public_key.to_string();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SLASHING_HISTORY)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;
        tracing::debug!(public_key = %key, "Stored slashing history");
        Ok(())
    }

    // =========================================================================
    // Network binding
    // =========================================================================

    /// Network recorded in this database, if any.
    pub fn stored_network(&self) -> SignerResult<Option<Network>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA)?;

        match table.get(NETWORK_KEY)? {
            Some(value) => value
                .value()
                .parse()
                .map(Some)
                .map_err(|e: String| SignerError::Storage(format!("corrupt network binding: {e}"))),
            None => Ok(None),
        }
    }

    /// Bind this database to `network`.
    ///
    /// The first call records the network. Later calls must name the same
    /// network: history written for one chain is meaningless on another.
    pub fn bind_network(&self, network: Network) -> SignerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA)?;
            let existing = table.get(NETWORK_KEY)?.map(|v| v.value().to_string());
            match existing {
                Some(stored) if stored == network.to_string() => {}
                Some(stored) => {
                    return Err(SignerError::Config(format!(
                        "database is bound to network '{stored}', configured network is '{network}'"
                    )));
                }
                None => {
                    let name = network.to_string();
                    table.insert(NETWORK_KEY, name.as_str())?;
                    tracing::info!(network = %network, "Bound database to network");
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // =========================================================================
    // Audit Log
    // =========================================================================

    /// Get the latest audit sequence number.
    pub fn get_latest_audit_seq(&self) -> SignerResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        let latest = table.iter()?.next_back().transpose()?.map(|(k, _)| k.value());

        Ok(latest)
    }

    /// Store a single audit entry by sequence number.
    pub fn put_audit_entry(&self, entry: &AuditEntry) -> SignerResult<()> {
        let value = serde_json::to_vec(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AUDIT_LOG)?;
            table.insert(entry.seq, value.as_slice())?;
        }
        write_txn.commit()?;
        tracing::trace!(seq = entry.seq, "Stored audit entry");
        Ok(())
    }

    /// Get a single audit entry by sequence number.
    pub fn get_audit_entry(&self, seq: u64) -> SignerResult<Option<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        match table.get(seq)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Audit entries with `start <= seq <= end`, in order.
    pub fn get_audit_entries(&self, start: u64, end: u64) -> SignerResult<Vec<AuditEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        table
            .range(start..=end)?
            .map(|entry| -> SignerResult<AuditEntry> {
                let (_, value) = entry?;
                Ok(serde_json::from_slice(value.value())?)
            })
            .collect()
    }
}

impl HistoryStore for Storage {
    fn get(&self, public_key: &PublicKey) -> SignerResult<SigningHistory> {
        Ok(self.get_history(public_key)?.unwrap_or_default())
    }

    fn put(&self, public_key: &PublicKey, history: &SigningHistory) -> SignerResult<()> {
        self.put_history(public_key, history)
    }
}
