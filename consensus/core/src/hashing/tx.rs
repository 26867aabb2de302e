use crate::tx::{Transaction, TransactionId};
use tessera_hashes::{Hasher, TransactionHash};

/// Not intended for direct use by clients. Instead use `tx.id()`
///
/// The id is the hash of the exact wire bytes, so anyone holding the raw transaction can
/// recompute it without trusting a decoder.
pub fn id(tx: &Transaction) -> TransactionId {
    id_from_bytes(&tx.to_bytes())
}

/// Recomputes a transaction id straight from wire bytes.
pub fn id_from_bytes(bytes: &[u8]) -> TransactionId {
    TransactionHash::hash(bytes)
}
