//! Slashing protection.
//!
//! - `types`: signing intents and per-account history
//! - `evaluator`: pure accept/refuse decision
//! - `arbiter`: per-key exclusive access
//! - `service`: decide, commit, then sign
//!
//! Control flow for one request:
//!
//! ```text
//! resolve account -> lock key -> load history -> evaluate -> persist -> sign -> unlock
//! ```

pub mod arbiter;
pub mod evaluator;
pub mod service;
pub mod types;

pub use arbiter::IdentityLocks;
pub use evaluator::{Decision, SlashingPolicy, evaluate};
pub use service::ArbitrationService;
pub use types::{PublicKey, SignIntent, Signature, SigningHistory, SigningMessage};
