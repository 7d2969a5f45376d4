//! Signing intents, signing history and the fixed-size byte types they use.
//!
//! Every intent carries the validator public key and signing domain, plus one
//! message variant. The variant set is closed: the evaluator matches on it
//! exhaustively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssz_types::{BitList, typenum::U2048};
use tree_hash_derive::TreeHash;

use crate::crypto::ssz;
use crate::error::{SignerError, SignerResult};

pub type Epoch = u64;
pub type Slot = u64;
pub type ValidatorIndex = u64;

/// Decode hex with an optional `0x` prefix.
pub fn decode_hex(value: &str) -> SignerResult<Vec<u8>> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| SignerError::InvalidInput(format!("invalid hex: {e}")))
}

/// Fixed-length byte arrays encoded as hex strings on the wire.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn from_slice(bytes: &[u8]) -> SignerResult<Self> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| {
                    SignerError::InvalidInput(format!(
                        "{}: expected {} bytes, got {}",
                        stringify!($name),
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(array))
            }
        }

        impl FromStr for $name {
            type Err = SignerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_slice(&decode_hex(s)?)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        impl tree_hash::TreeHash for $name {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Vector
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                tree_hash::PackedEncoding::from_slice(&self.0)
            }

            fn tree_hash_packing_factor() -> usize {
                1
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                tree_hash::merkle_root(&self.0, Self::LEN.div_ceil(tree_hash::BYTES_PER_CHUNK))
            }
        }
    };
}

fixed_bytes!(
    /// Compressed BLS12-381 G1 public key.
    PublicKey,
    48
);
fixed_bytes!(
    /// 32-byte SSZ root.
    Root,
    32
);
fixed_bytes!(
    /// Signing domain (fork version + genesis validators root digest).
    Domain,
    32
);
fixed_bytes!(
    /// Compressed BLS12-381 G2 signature.
    Signature,
    96
);

/// Attesting committee bits, bounded by MAX_VALIDATORS_PER_COMMITTEE.
pub type AggregationBits = BitList<U2048>;

/// Hex form of the SSZ bytes, length delimiter bit included.
mod aggregation_bits_hex {
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::{AggregationBits, decode_hex};

    pub fn serialize<S: Serializer>(
        bits: &AggregationBits,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bits.as_slice()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<AggregationBits, D::Error> {
        let value = String::deserialize(deserializer)?;
        let bytes = decode_hex(&value).map_err(de::Error::custom)?;
        AggregationBits::from_bytes(bytes.into())
            .map_err(|e| de::Error::custom(format!("invalid aggregation bits: {e:?}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct AttestationData {
    pub slot: Slot,
    pub committee_index: u64,
    pub beacon_block_root: Root,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct Attestation {
    #[serde(with = "aggregation_bits_hex")]
    pub aggregation_bits: AggregationBits,
    pub data: AttestationData,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct AggregateAndProof {
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    pub selection_proof: Signature,
}

/// Block header fields. A full or blinded block has the same hash tree root as
/// its header, so the body is carried only as its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body_root: Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TreeHash)]
pub struct VoluntaryExit {
    pub epoch: Epoch,
    pub validator_index: ValidatorIndex,
}

/// The message being signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SigningMessage {
    Attestation(AttestationData),
    AggregateAndProof(AggregateAndProof),
    Block(BeaconBlockHeader),
    /// Header whose body root commits to an execution payload header.
    BlindedBlock(BeaconBlockHeader),
    VoluntaryExit(VoluntaryExit),
    RandaoReveal { epoch: Epoch },
}

impl SigningMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attestation(_) => "attestation",
            Self::AggregateAndProof(_) => "aggregate_and_proof",
            Self::Block(_) => "block",
            Self::BlindedBlock(_) => "blinded_block",
            Self::VoluntaryExit(_) => "voluntary_exit",
            Self::RandaoReveal { .. } => "randao_reveal",
        }
    }

    /// Attestation data subject to double/surround vote checks.
    pub fn attestation_data(&self) -> Option<&AttestationData> {
        match self {
            Self::Attestation(data) => Some(data),
            Self::AggregateAndProof(agg) => Some(&agg.aggregate.data),
            _ => None,
        }
    }

    /// Slot subject to double proposal checks.
    pub fn proposal_slot(&self) -> Option<Slot> {
        match self {
            Self::Block(header) | Self::BlindedBlock(header) => Some(header.slot),
            _ => None,
        }
    }
}

/// A decoded request to sign `message` with the key behind `public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignIntent {
    pub public_key: PublicKey,
    pub domain: Domain,
    #[serde(flatten)]
    pub message: SigningMessage,
}

impl SignIntent {
    /// `hash_tree_root(SigningData { object_root, domain })`.
    pub fn signing_root(&self) -> Root {
        ssz::signing_root(&ssz::object_root(&self.message), &self.domain)
    }
}

/// Highest attested checkpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationMark {
    pub source_epoch: Epoch,
    pub target_epoch: Epoch,
}

/// Persisted per-account slashing protection state.
///
/// `None` means never seeded, which is not the same as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_attestation: Option<AttestationMark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_proposal: Option<Slot>,
}

impl SigningHistory {
    /// History seeded at genesis: attestations and proposals both allowed from
    /// epoch/slot 1 onwards.
    pub fn genesis() -> Self {
        Self {
            highest_attestation: Some(AttestationMark {
                source_epoch: 0,
                target_epoch: 0,
            }),
            highest_proposal: Some(0),
        }
    }

    /// Merge `seed` into this history, refusing to lower any stored value.
    pub fn merge_seed(&self, seed: &Self) -> SignerResult<Self> {
        let highest_attestation = match (self.highest_attestation, seed.highest_attestation) {
            (Some(stored), Some(new))
                if new.target_epoch < stored.target_epoch
                    || new.source_epoch < stored.source_epoch =>
            {
                return Err(SignerError::InvalidInput(format!(
                    "seed attestation ({}, {}) is below stored ({}, {})",
                    new.source_epoch, new.target_epoch, stored.source_epoch, stored.target_epoch
                )));
            }
            (_, Some(new)) => Some(new),
            (stored, None) => stored,
        };

        let highest_proposal = match (self.highest_proposal, seed.highest_proposal) {
            (Some(stored), Some(new)) if new < stored => {
                return Err(SignerError::InvalidInput(format!(
                    "seed proposal slot {new} is below stored slot {stored}"
                )));
            }
            (_, Some(new)) => Some(new),
            (stored, None) => stored,
        };

        Ok(Self {
            highest_attestation,
            highest_proposal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "01000000f071c66c6561d0b939feb15f513a019d99a84bd85635221e3ad42dac";

    #[test]
    fn test_fixed_bytes_accepts_optional_prefix() {
        let plain: Domain = DOMAIN.parse().unwrap();
        let prefixed: Domain = format!("0x{DOMAIN}").parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.to_string(), DOMAIN);
    }

    #[test]
    fn test_fixed_bytes_rejects_wrong_length() {
        let err = "abcd".parse::<PublicKey>().unwrap_err();
        assert!(err.to_string().contains("expected 48 bytes"));
    }

    #[test]
    fn test_decode_attestation_intent() {
        let body = serde_json::json!({
            "type": "attestation",
            "public_key": "ab".repeat(48),
            "domain": DOMAIN,
            "slot": 284115,
            "committee_index": 2,
            "beacon_block_root": "7b5679277ca45ea74e1deebc9d3e8c0e7d6c570b3cfaf6884be144a81dac9a0e",
            "source": { "epoch": 8877, "root": "7402fdc1ce16d449d637c34a172b349a12b2bae8d6d77e401006594d8057c33d" },
            "target": { "epoch": 8878, "root": "17959acc370274756fa5e9fdd7e7adf17204f49cc8457e49438c42c4883cbfb0" }
        });

        let intent: SignIntent = serde_json::from_value(body).unwrap();
        let data = intent.message.attestation_data().unwrap();
        assert_eq!(data.source.epoch, 8877);
        assert_eq!(data.target.epoch, 8878);
        assert_eq!(intent.message.kind(), "attestation");
    }

    #[test]
    fn test_decode_randao_reveal() {
        let body = serde_json::json!({
            "type": "randao_reveal",
            "public_key": "ab".repeat(48),
            "domain": DOMAIN,
            "epoch": 12
        });

        let intent: SignIntent = serde_json::from_value(body).unwrap();
        assert_eq!(intent.message, SigningMessage::RandaoReveal { epoch: 12 });
        assert!(intent.message.proposal_slot().is_none());
    }

    #[test]
    fn test_aggregation_bits_need_delimiter() {
        let aggregate = |bits: &str| {
            serde_json::json!({
                "type": "aggregate_and_proof",
                "public_key": "ab".repeat(48),
                "domain": DOMAIN,
                "aggregator_index": 9,
                "aggregate": {
                    "aggregation_bits": bits,
                    "data": {
                        "slot": 284115,
                        "committee_index": 2,
                        "beacon_block_root": "00".repeat(32),
                        "source": { "epoch": 8877, "root": "00".repeat(32) },
                        "target": { "epoch": 8878, "root": "00".repeat(32) }
                    },
                    "signature": "00".repeat(96)
                },
                "selection_proof": "00".repeat(96)
            })
        };

        let intent: SignIntent = serde_json::from_value(aggregate("0x05")).unwrap();
        let SigningMessage::AggregateAndProof(agg) = &intent.message else {
            panic!("expected aggregate");
        };
        assert_eq!(agg.aggregate.aggregation_bits.len(), 2);
        assert_eq!(serde_json::to_value(&intent).unwrap()["aggregate"]["aggregation_bits"], "05");

        assert!(serde_json::from_value::<SignIntent>(aggregate("ff00")).is_err());
        assert!(serde_json::from_value::<SignIntent>(aggregate("")).is_err());
    }

    #[test]
    fn test_unknown_message_type_is_rejected() {
        let body = serde_json::json!({
            "type": "sync_committee_message",
            "public_key": "ab".repeat(48),
            "domain": DOMAIN
        });
        assert!(serde_json::from_value::<SignIntent>(body).is_err());
    }

    #[test]
    fn test_absent_history_is_distinct_from_zero() {
        let absent: SigningHistory = serde_json::from_str("{}").unwrap();
        assert!(absent.highest_attestation.is_none());
        assert!(absent.highest_proposal.is_none());
        assert_ne!(absent, SigningHistory::genesis());
    }

    #[test]
    fn test_merge_seed_never_lowers() {
        let stored = SigningHistory {
            highest_attestation: Some(AttestationMark {
                source_epoch: 10,
                target_epoch: 11,
            }),
            highest_proposal: Some(100),
        };

        let lower = SigningHistory {
            highest_attestation: None,
            highest_proposal: Some(99),
        };
        assert!(stored.merge_seed(&lower).is_err());

        let raise = SigningHistory {
            highest_attestation: Some(AttestationMark {
                source_epoch: 10,
                target_epoch: 20,
            }),
            highest_proposal: None,
        };
        let merged = stored.merge_seed(&raise).unwrap();
        assert_eq!(merged.highest_attestation.unwrap().target_epoch, 20);
        assert_eq!(merged.highest_proposal, Some(100));
    }
}
