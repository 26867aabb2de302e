//!
//! Signature mock shared by the unit and integration tests.
//!

use tessera_hashes::{Hash, Hasher, TransactionSigningHash};

use crate::token::SigVerifier;

/// Accepts a signature equal to the signing hash of the pubkey and the digest.
pub struct MockVerifier;

impl SigVerifier for MockVerifier {
    fn verify(&self, pubkey: &[u8], signature: &[u8], digest: &Hash) -> bool {
        signature == mock_sign(pubkey, digest).as_slice()
    }
}

pub fn mock_sign(pubkey: &[u8], digest: &Hash) -> Vec<u8> {
    let mut data = pubkey.to_vec();
    data.extend_from_slice(&digest.as_bytes());
    TransactionSigningHash::hash(data).as_bytes().to_vec()
}
