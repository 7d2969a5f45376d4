//! Signature computation.
//!
//! - `ssz`: hash tree roots and signing roots
//! - `BlsSigner`: BLS12-381 signatures over a signing root
//!
//! The arbitration engine only sees the `MessageSigner` trait. A failure here
//! is an infrastructure fault, never a policy refusal.

pub mod ssz;

use blst::BLST_ERROR;
use blst::min_pk::{PublicKey as BlsPublicKey, Signature as BlsSignature};

use crate::error::{SignerError, SignerResult};
use crate::keystore::KeyHandle;
use crate::slashing::types::{PublicKey, Root, Signature};

/// Domain separation tag for Ethereum consensus BLS signatures.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Produces a signature over an approved signing root.
pub trait MessageSigner: Send + Sync {
    fn sign(&self, key: &KeyHandle, signing_root: &Root) -> SignerResult<Signature>;
}

/// Local BLS signer using in-memory key handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlsSigner;

impl MessageSigner for BlsSigner {
    fn sign(&self, key: &KeyHandle, signing_root: &Root) -> SignerResult<Signature> {
        let signature = key.secret().sign(&signing_root.0, BLS_DST, &[]);
        Ok(Signature(signature.to_bytes()))
    }
}

/// Check `signature` over `signing_root` against `public_key`.
pub fn verify(public_key: &PublicKey, signing_root: &Root, signature: &Signature) -> SignerResult<bool> {
    let public_key = BlsPublicKey::from_bytes(&public_key.0)
        .map_err(|e| SignerError::InvalidInput(format!("invalid BLS public key: {e:?}")))?;
    let signature = BlsSignature::from_bytes(&signature.0)
        .map_err(|e| SignerError::InvalidInput(format!("invalid BLS signature: {e:?}")))?;

    let result = signature.verify(true, &signing_root.0, BLS_DST, &[], &public_key, true);
    Ok(result == BLST_ERROR::BLST_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blst::min_pk::SecretKey;

    fn handle(seed: u8) -> KeyHandle {
        let secret = SecretKey::key_gen(&[seed; 32], &[]).unwrap();
        KeyHandle::from_secret_bytes(&secret.to_bytes()).unwrap()
    }

    #[test]
    fn test_signature_verifies() {
        let key = handle(7);
        let root = Root([0x42; 32]);

        let signature = BlsSigner.sign(&key, &root).unwrap();
        assert!(verify(key.public_key(), &root, &signature).unwrap());
    }

    #[test]
    fn test_signature_bound_to_root_and_key() {
        let key = handle(7);
        let other = handle(8);
        let root = Root([0x42; 32]);

        let signature = BlsSigner.sign(&key, &root).unwrap();
        assert!(!verify(key.public_key(), &Root([0x43; 32]), &signature).unwrap());
        assert!(!verify(other.public_key(), &root, &signature).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = handle(9);
        let root = Root([1; 32]);
        assert_eq!(
            BlsSigner.sign(&key, &root).unwrap(),
            BlsSigner.sign(&key, &root).unwrap()
        );
    }
}
