//! Pure slashing decision function.
//!
//! No I/O: given a message, the stored history and the current chain time,
//! decide whether signing is safe and what the history becomes if it is.

use serde::{Deserialize, Serialize};

use crate::chain::ChainTime;
use crate::error::Refusal;
use crate::slashing::types::{AttestationData, AttestationMark, SigningHistory, SigningMessage, Slot};

/// How far ahead of the wall clock a message may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingPolicy {
    pub max_future_epochs: u64,
    pub max_future_slots: u64,
}

impl SlashingPolicy {
    pub const DEFAULT_MAX_FUTURE_EPOCHS: u64 = 1000;
    pub const DEFAULT_MAX_FUTURE_SLOTS: u64 = 32_000;
}

impl Default for SlashingPolicy {
    fn default() -> Self {
        Self {
            max_future_epochs: Self::DEFAULT_MAX_FUTURE_EPOCHS,
            max_future_slots: Self::DEFAULT_MAX_FUTURE_SLOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Safe to sign. `updated` is the history to persist before signing, or
    /// `None` when the message does not touch slashing history.
    Accept { updated: Option<SigningHistory> },
    Reject(Refusal),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

pub fn evaluate(
    message: &SigningMessage,
    history: &SigningHistory,
    now: ChainTime,
    policy: &SlashingPolicy,
) -> Decision {
    if let Some(data) = message.attestation_data() {
        return evaluate_attestation(data, history, now, policy);
    }
    if let Some(slot) = message.proposal_slot() {
        return evaluate_proposal(slot, history, now, policy);
    }
    // Voluntary exits and RANDAO reveals carry no slashing risk.
    Decision::Accept { updated: None }
}

fn evaluate_attestation(
    data: &AttestationData,
    history: &SigningHistory,
    now: ChainTime,
    policy: &SlashingPolicy,
) -> Decision {
    let source = data.source.epoch;
    let target = data.target.epoch;

    // Source before target: when both are far out the source is reported.
    let horizon = now.epoch.saturating_add(policy.max_future_epochs);
    if source > horizon {
        return Decision::Reject(Refusal::FarFutureSourceEpoch);
    }
    if target > horizon {
        return Decision::Reject(Refusal::FarFutureTargetEpoch);
    }

    let Some(highest) = history.highest_attestation else {
        return Decision::Reject(Refusal::NoBaselineSlashingData);
    };

    if target <= highest.target_epoch {
        return Decision::Reject(Refusal::DoubleVote);
    }

    let surrounding = source < highest.source_epoch && target > highest.target_epoch;
    let surrounded = source > highest.source_epoch && target < highest.target_epoch;
    if surrounding || surrounded {
        return Decision::Reject(Refusal::SurroundVote);
    }

    Decision::Accept {
        updated: Some(SigningHistory {
            highest_attestation: Some(AttestationMark {
                source_epoch: source,
                target_epoch: target,
            }),
            ..*history
        }),
    }
}

fn evaluate_proposal(
    slot: Slot,
    history: &SigningHistory,
    now: ChainTime,
    policy: &SlashingPolicy,
) -> Decision {
    if slot > now.slot.saturating_add(policy.max_future_slots) {
        return Decision::Reject(Refusal::FarFutureSlot);
    }

    if let Some(highest) = history.highest_proposal
        && slot <= highest
    {
        return Decision::Reject(Refusal::DoubleProposal);
    }

    Decision::Accept {
        updated: Some(SigningHistory {
            highest_proposal: Some(slot),
            ..*history
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slashing::types::{
        AggregateAndProof, AggregationBits, Attestation, BeaconBlockHeader, Checkpoint, Root,
        Signature, VoluntaryExit,
    };

    const NOW: ChainTime = ChainTime {
        epoch: 9000,
        slot: 288_000,
    };

    fn policy() -> SlashingPolicy {
        SlashingPolicy {
            max_future_epochs: 100,
            max_future_slots: 3200,
        }
    }

    fn attestation_data(source: u64, target: u64) -> AttestationData {
        AttestationData {
            slot: 284_115,
            committee_index: 2,
            beacon_block_root: Root([1; 32]),
            source: Checkpoint {
                epoch: source,
                root: Root([2; 32]),
            },
            target: Checkpoint {
                epoch: target,
                root: Root([3; 32]),
            },
        }
    }

    fn attestation(source: u64, target: u64) -> SigningMessage {
        SigningMessage::Attestation(attestation_data(source, target))
    }

    fn block(slot: u64) -> SigningMessage {
        SigningMessage::Block(BeaconBlockHeader {
            slot,
            proposer_index: 1010,
            parent_root: Root([4; 32]),
            state_root: Root([5; 32]),
            body_root: Root([6; 32]),
        })
    }

    fn with_attestation(source: u64, target: u64) -> SigningHistory {
        SigningHistory {
            highest_attestation: Some(AttestationMark {
                source_epoch: source,
                target_epoch: target,
            }),
            highest_proposal: None,
        }
    }

    fn reject(message: &SigningMessage, history: &SigningHistory) -> Refusal {
        match evaluate(message, history, NOW, &policy()) {
            Decision::Reject(refusal) => refusal,
            Decision::Accept { .. } => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_accepts_progressing_attestation() {
        let history = with_attestation(8877, 8878);
        let decision = evaluate(&attestation(8878, 8879), &history, NOW, &policy());
        assert_eq!(
            decision,
            Decision::Accept {
                updated: Some(with_attestation(8878, 8879))
            }
        );
    }

    #[test]
    fn test_double_vote() {
        let history = with_attestation(8877, 8878);
        assert_eq!(reject(&attestation(8877, 8878), &history), Refusal::DoubleVote);
        assert_eq!(reject(&attestation(8877, 8877), &history), Refusal::DoubleVote);
        assert_eq!(reject(&attestation(1, 2), &history), Refusal::DoubleVote);
    }

    #[test]
    fn test_surrounding_vote() {
        let history = with_attestation(8877, 8878);
        assert_eq!(reject(&attestation(8876, 8879), &history), Refusal::SurroundVote);
    }

    #[test]
    fn test_same_source_higher_target_is_not_surround() {
        let history = with_attestation(8877, 8878);
        assert!(evaluate(&attestation(8877, 8890), &history, NOW, &policy()).is_accept());
    }

    #[test]
    fn test_missing_baseline_fails_closed() {
        let history = SigningHistory::default();
        assert_eq!(
            reject(&attestation(77, 78), &history),
            Refusal::NoBaselineSlashingData
        );
        assert_eq!(
            reject(&attestation(0, 0), &history),
            Refusal::NoBaselineSlashingData
        );
    }

    #[test]
    fn test_far_future_source_only() {
        let history = with_attestation(0, 0);
        assert_eq!(
            reject(&attestation(9101, 9050), &history),
            Refusal::FarFutureSourceEpoch
        );
    }

    #[test]
    fn test_far_future_target_only() {
        let history = with_attestation(0, 0);
        assert_eq!(
            reject(&attestation(77, 9101), &history),
            Refusal::FarFutureTargetEpoch
        );
    }

    #[test]
    fn test_far_future_both_reports_source() {
        let history = with_attestation(0, 0);
        assert_eq!(
            reject(&attestation(9101, 9102), &history),
            Refusal::FarFutureSourceEpoch
        );
    }

    #[test]
    fn test_horizon_boundary_is_inclusive() {
        let history = with_attestation(0, 0);
        assert!(evaluate(&attestation(9100, 9100), &history, NOW, &policy()).is_accept());
    }

    #[test]
    fn test_far_future_checked_before_baseline() {
        assert_eq!(
            reject(&attestation(9101, 9102), &SigningHistory::default()),
            Refusal::FarFutureSourceEpoch
        );
    }

    #[test]
    fn test_aggregate_uses_embedded_attestation() {
        let message = SigningMessage::AggregateAndProof(AggregateAndProof {
            aggregator_index: 1,
            aggregate: Attestation {
                aggregation_bits: AggregationBits::with_capacity(0).unwrap(),
                data: attestation_data(8877, 8878),
                signature: Signature([0; 96]),
            },
            selection_proof: Signature([0; 96]),
        });
        let history = with_attestation(8877, 8878);
        assert_eq!(reject(&message, &history), Refusal::DoubleVote);
    }

    #[test]
    fn test_proposal_progression() {
        let history = SigningHistory {
            highest_attestation: None,
            highest_proposal: Some(77),
        };

        let decision = evaluate(&block(78), &history, NOW, &policy());
        let Decision::Accept {
            updated: Some(updated),
        } = decision
        else {
            panic!("expected accept with update");
        };
        assert_eq!(updated.highest_proposal, Some(78));

        assert_eq!(reject(&block(78), &updated), Refusal::DoubleProposal);
        assert_eq!(reject(&block(10), &updated), Refusal::DoubleProposal);
    }

    #[test]
    fn test_unseeded_proposal_is_accepted() {
        assert!(evaluate(&block(1), &SigningHistory::default(), NOW, &policy()).is_accept());
    }

    #[test]
    fn test_far_future_proposal() {
        assert_eq!(
            reject(&block(NOW.slot + 3201), &SigningHistory::default()),
            Refusal::FarFutureSlot
        );
    }

    #[test]
    fn test_proposal_preserves_attestation_history() {
        let history = with_attestation(5, 6);
        let Decision::Accept {
            updated: Some(updated),
        } = evaluate(&block(100), &history, NOW, &policy())
        else {
            panic!("expected accept with update");
        };
        assert_eq!(updated.highest_attestation, history.highest_attestation);
    }

    #[test]
    fn test_exit_and_randao_skip_history() {
        let exit = SigningMessage::VoluntaryExit(VoluntaryExit {
            epoch: 10,
            validator_index: 3,
        });
        let randao = SigningMessage::RandaoReveal { epoch: 10 };
        let history = SigningHistory::default();

        assert_eq!(
            evaluate(&exit, &history, NOW, &policy()),
            Decision::Accept { updated: None }
        );
        assert_eq!(
            evaluate(&randao, &history, NOW, &policy()),
            Decision::Accept { updated: None }
        );
    }
}
