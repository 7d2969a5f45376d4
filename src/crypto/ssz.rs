//! Signing roots for the message types we sign.
//!
//! The signed containers derive `TreeHash`. This module picks the object each
//! message kind commits to and wraps its root in `SigningData` with the domain.

use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

use crate::slashing::types::{Domain, Root, SigningMessage};

#[derive(TreeHash)]
struct SigningData {
    object_root: Root,
    domain: Domain,
}

fn root_of(value: &impl TreeHash) -> Root {
    Root(value.tree_hash_root().0)
}

/// Hash tree root of the object being signed.
pub fn object_root(message: &SigningMessage) -> Root {
    match message {
        SigningMessage::Attestation(data) => root_of(data),
        SigningMessage::AggregateAndProof(agg) => root_of(agg),
        SigningMessage::Block(header) | SigningMessage::BlindedBlock(header) => root_of(header),
        SigningMessage::VoluntaryExit(exit) => root_of(exit),
        SigningMessage::RandaoReveal { epoch } => root_of(epoch),
    }
}

/// `hash_tree_root(SigningData { object_root, domain })`.
pub fn signing_root(object_root: &Root, domain: &Domain) -> Root {
    root_of(&SigningData {
        object_root: *object_root,
        domain: *domain,
    })
}
