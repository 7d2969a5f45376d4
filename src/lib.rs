// Crate-level lint configuration
// Allow noisy pedantic/cargo lints that aren't worth fixing individually
#![allow(clippy::multiple_crate_versions)] // Transitive deps, can't easily fix
#![allow(clippy::missing_errors_doc)] // Would require extensive doc changes
#![allow(clippy::missing_panics_doc)] // Would require extensive doc changes
#![allow(clippy::must_use_candidate)] // Too many false positives for internal APIs
#![allow(clippy::module_name_repetitions)] // Acceptable for clarity (e.g., SignerError in error mod)
#![allow(clippy::doc_markdown)] // Too strict about backticks in docs
#![allow(clippy::missing_const_for_fn)] // Often debatable, runtime doesn't benefit

//! Slashing-Protected Remote Signer
//!
//! Signs Ethereum consensus messages (attestations, aggregates, block
//! proposals, voluntary exits, RANDAO reveals) for validator keys it holds,
//! refusing anything that could get a validator slashed.
//!
//! ## Architecture
//!
//! - **Evaluator**: pure double vote, surround vote and double proposal checks
//!   against the highest signed attestation and proposal per key
//! - **Arbiter**: at most one in-flight decision per key; contention is
//!   refused with `Locked`, never queued
//! - **Commit before sign**: the new history is durable before the BLS signer
//!   runs, so a crash can lose a signature but never sign twice
//!
//! ## Safety model
//!
//! - Attestations for a key with no recorded history are refused (fail closed)
//! - Messages too far ahead of the wall clock are refused
//! - The database is bound to one network
//! - Every decision is written to a hash-chained, signed audit log

pub mod audit;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod middleware;
pub mod routes;
pub mod slashing;
pub mod storage;

#[cfg(feature = "otel")]
pub mod telemetry;

#[cfg(not(feature = "otel"))]
pub mod telemetry {
    //! Stub telemetry module when OpenTelemetry is disabled.

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    /// Initialize tracing with console output only.
    pub fn init_tracing() {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "slashing_signer=info,actix_web=info".into());
        let fmt_layer = tracing_subscriber::fmt::layer();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    /// No-op shutdown when OpenTelemetry is disabled.
    pub fn shutdown_tracing() {}
}

// Re-export commonly used types
pub use config::Settings;
pub use error::{Refusal, SignerError, SignerResult};
pub use slashing::{ArbitrationService, SignIntent, SigningHistory};
