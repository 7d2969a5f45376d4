//! Arbitration service: the only path from a signing intent to a signature.
//!
//! Resolve account, take the per-key lock, evaluate against stored history,
//! persist the new history, then sign. History is committed before the signer
//! runs and is never rolled back.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditActor, AuditEventType, AuditLogger, AuditOutcome};
use crate::chain::BeaconClock;
use crate::crypto::MessageSigner;
use crate::error::{Refusal, SignerError, SignerResult};
use crate::keystore::AccountResolver;
use crate::slashing::arbiter::IdentityLocks;
use crate::slashing::evaluator::{Decision, SlashingPolicy, evaluate};
use crate::slashing::types::{PublicKey, SignIntent, Signature, SigningHistory};
use crate::storage::HistoryStore;

pub struct ArbitrationService {
    accounts: Arc<dyn AccountResolver>,
    history: Arc<dyn HistoryStore>,
    signer: Arc<dyn MessageSigner>,
    clock: Arc<dyn BeaconClock>,
    policy: SlashingPolicy,
    locks: IdentityLocks,
    audit: Option<Arc<AuditLogger>>,
}

impl ArbitrationService {
    pub fn new(
        accounts: Arc<dyn AccountResolver>,
        history: Arc<dyn HistoryStore>,
        signer: Arc<dyn MessageSigner>,
        clock: Arc<dyn BeaconClock>,
        policy: SlashingPolicy,
    ) -> Self {
        Self {
            accounts,
            history,
            signer,
            clock,
            policy,
            locks: IdentityLocks::new(),
            audit: None,
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn policy(&self) -> &SlashingPolicy {
        &self.policy
    }

    /// Managed public keys.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.accounts.public_keys()
    }

    /// Decide whether `intent` is safe and, if so, sign it.
    pub fn decide_and_sign(&self, intent: &SignIntent) -> SignerResult<Signature> {
        let request_id = Uuid::new_v4();
        let public_key = intent.public_key;
        let kind = intent.message.kind();

        let Some(key) = self.accounts.resolve(&public_key) else {
            tracing::warn!(public_key = %public_key, kind, "Signing request for unmanaged key");
            return Err(SignerError::AccountNotFound);
        };

        let signing_root = intent.signing_root();
        let mut committed = false;

        let result = self.locks.with_exclusive_access(&public_key, || {
            let stored = self.history.get(&public_key)?;
            let now = self.clock.now();

            let updated = match evaluate(&intent.message, &stored, now, &self.policy) {
                Decision::Reject(refusal) => {
                    if refusal.is_slashable() {
                        tracing::error!(
                            public_key = %public_key,
                            kind,
                            code = refusal.code(),
                            epoch = now.epoch,
                            "Refused slashable request"
                        );
                    } else {
                        tracing::warn!(
                            public_key = %public_key,
                            kind,
                            code = refusal.code(),
                            epoch = now.epoch,
                            "Refused to sign"
                        );
                    }
                    return Err(SignerError::Refused(refusal));
                }
                Decision::Accept { updated } => updated,
            };

            if let Some(updated) = updated {
                self.history.put(&public_key, &updated)?;
                committed = true;
            }

            self.signer.sign(&key, &signing_root).map_err(|e| {
                if committed {
                    tracing::error!(
                        public_key = %public_key,
                        kind,
                        signing_root = %signing_root,
                        error = %e,
                        "Signer failed after history commit; manual reconciliation required"
                    );
                } else {
                    tracing::error!(
                        public_key = %public_key,
                        kind,
                        signing_root = %signing_root,
                        error = %e,
                        "Signer failed"
                    );
                }
                SignerError::SigningFailed(e.to_string())
            })
        });

        let mut context = json!({ "kind": kind, "signing_root": signing_root.to_string() });
        match &result {
            Ok(_) => {
                tracing::info!(public_key = %public_key, kind, "Signed");
                self.record(
                    AuditEventType::SignAccepted,
                    AuditActor::Validator { public_key },
                    request_id,
                    AuditOutcome::Success,
                    context,
                );
            }
            Err(SignerError::SigningFailed(reason)) => {
                context["committed"] = json!(committed);
                self.record(
                    AuditEventType::SignFailed,
                    AuditActor::Validator { public_key },
                    request_id,
                    AuditOutcome::Failure {
                        reason: reason.clone(),
                    },
                    context,
                );
            }
            Err(e @ (SignerError::Refused(_) | SignerError::Locked)) => {
                context["slashable"] = json!(e.refusal().is_some_and(Refusal::is_slashable));
                self.record(
                    AuditEventType::SignRefused,
                    AuditActor::Validator { public_key },
                    request_id,
                    AuditOutcome::Failure {
                        reason: e.error_code().unwrap_or_default().to_string(),
                    },
                    context,
                );
            }
            Err(_) => {}
        }

        result
    }

    /// Merge operator-supplied history into the stored history.
    ///
    /// Refused if any provided value is lower than the stored one.
    pub fn seed_history(
        &self,
        public_key: &PublicKey,
        seed: &SigningHistory,
    ) -> SignerResult<SigningHistory> {
        if self.accounts.resolve(public_key).is_none() {
            return Err(SignerError::AccountNotFound);
        }

        let merged = self.locks.with_exclusive_access(public_key, || {
            let stored = self.history.get(public_key)?;
            let merged = stored.merge_seed(seed)?;
            if merged != stored {
                self.history.put(public_key, &merged)?;
            }
            Ok(merged)
        })?;

        tracing::info!(
            public_key = %public_key,
            highest_attestation = ?merged.highest_attestation,
            highest_proposal = ?merged.highest_proposal,
            "Seeded slashing history"
        );
        self.record(
            AuditEventType::HistorySeeded,
            AuditActor::Operator {
                public_key: *public_key,
            },
            Uuid::new_v4(),
            AuditOutcome::Success,
            json!({ "history": merged }),
        );

        Ok(merged)
    }

    /// Stored history for a managed key.
    pub fn history(&self, public_key: &PublicKey) -> SignerResult<SigningHistory> {
        if self.accounts.resolve(public_key).is_none() {
            return Err(SignerError::AccountNotFound);
        }
        self.history.get(public_key)
    }

    fn record(
        &self,
        event_type: AuditEventType,
        actor: AuditActor,
        request_id: Uuid,
        outcome: AuditOutcome,
        context: serde_json::Value,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.append(event_type, actor, Some(request_id), outcome, Some(context)) {
            tracing::warn!(error = %e, event_type = %event_type, "Failed to append audit entry");
        }
    }
}
