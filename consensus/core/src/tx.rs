mod script_public_key;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tessera_hashes::Hash;

pub use script_public_key::{STATE_ROOT_SCRIPT, ScriptPublicKey, ScriptPublicKeyVersion};

use crate::{
    config::constants::{TX_INPUT_COUNT_MAX, TX_OUTPUT_COUNT_MAX},
    errors::{PopulationError, TxCodecError, TxCodecResult},
    hashing,
};

/// Represents the ID of a transaction
pub type TransactionId = Hash;

/// Represents the index of an output within its transaction
pub type TransactionIndexType = u32;

/// Data field of an output which carries no application state. No real state hash can equal
/// it since state hashes are domain-separated blake2b digests of non-empty records.
pub const NO_STATE_HASH: Hash = Hash::from_bytes([0xff; 32]);

/// Represents a transaction outpoint
#[derive(Eq, Hash, PartialEq, Debug, Copy, Clone, Default, PartialOrd, Ord, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: u32) -> Self {
        Self { transaction_id, index }
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Represents a transaction input
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    pub sequence: u64,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, sequence: u64) -> Self {
        Self { previous_outpoint, sequence }
    }
}

/// Represents a transaction output. `data` is the hash of the output state, or
/// [`NO_STATE_HASH`] for plain value outputs.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
    pub data: Hash,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey, data: Hash) -> Self {
        Self { value, script_public_key, data }
    }

    pub fn stateless(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self::new(value, script_public_key, NO_STATE_HASH)
    }

    /// The reserved output 0 carrying the state hash root of the transaction.
    pub fn state_root(root: Hash) -> Self {
        Self::new(0, ScriptPublicKey::state_root(), root)
    }

    pub fn has_state(&self) -> bool {
        self.data != NO_STATE_HASH
    }
}

/// An output as the outputs digest commits to it. The locking script enters through its hash
/// only, so a covenant can rebuild outputs paying to scripts it knows by hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedOutput {
    pub value: u64,
    pub script_version: ScriptPublicKeyVersion,
    pub script_hash: Hash,
    pub data: Hash,
}

impl CommittedOutput {
    pub fn new(value: u64, script_hash: Hash, data: Hash) -> Self {
        Self { value, script_version: 0, script_hash, data }
    }

    pub fn stateless(value: u64, script_hash: Hash) -> Self {
        Self::new(value, script_hash, NO_STATE_HASH)
    }

    pub fn state_root(root: Hash) -> Self {
        Self::from(&TransactionOutput::state_root(root))
    }
}

impl From<&TransactionOutput> for CommittedOutput {
    fn from(output: &TransactionOutput) -> Self {
        Self {
            value: output.value,
            script_version: output.script_public_key.version(),
            script_hash: output.script_public_key.script_hash(),
            data: output.data,
        }
    }
}

/// Represents a transaction
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
}

impl Transaction {
    pub fn new(version: u16, inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, lock_time: u64) -> Self {
        Self { version, inputs, outputs, lock_time }
    }

    /// The wire encoding of the transaction. Backtrace witnesses carry exactly these bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("serializing into a vec never fails")
    }

    /// Decodes wire bytes, rejecting trailing data and transactions above the protocol maxima.
    pub fn from_bytes(bytes: &[u8]) -> TxCodecResult<Self> {
        let tx: Transaction = borsh::from_slice(bytes).map_err(|err| TxCodecError::Malformed(err.to_string()))?;
        if tx.inputs.len() > TX_INPUT_COUNT_MAX {
            return Err(TxCodecError::TooManyInputs(tx.inputs.len(), TX_INPUT_COUNT_MAX));
        }
        if tx.outputs.len() > TX_OUTPUT_COUNT_MAX {
            return Err(TxCodecError::TooManyOutputs(tx.outputs.len(), TX_OUTPUT_COUNT_MAX));
        }
        Ok(tx)
    }

    pub fn id(&self) -> TransactionId {
        hashing::tx::id(self)
    }

    pub fn outpoint(&self, index: TransactionIndexType) -> TransactionOutpoint {
        TransactionOutpoint::new(self.id(), index)
    }
}

/// Holds details about an individual transaction output in a utxo set: how much it pays,
/// its locking script and its data (state hash) field.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub data: Hash,
}

impl UtxoEntry {
    pub fn new(amount: u64, script_public_key: ScriptPublicKey, data: Hash) -> Self {
        Self { amount, script_public_key, data }
    }
}

impl From<&TransactionOutput> for UtxoEntry {
    fn from(output: &TransactionOutput) -> Self {
        Self::new(output.value, output.script_public_key.clone(), output.data)
    }
}

/// A transaction along with the utxo entries its inputs spend.
pub struct PopulatedTransaction<'a> {
    pub tx: &'a Transaction,
    pub entries: Vec<UtxoEntry>,
}

impl<'a> PopulatedTransaction<'a> {
    pub fn new(tx: &'a Transaction, entries: Vec<UtxoEntry>) -> Result<Self, PopulationError> {
        if tx.inputs.len() != entries.len() {
            return Err(PopulationError::EntryCountMismatch(tx.inputs.len(), entries.len()));
        }
        Ok(Self { tx, entries })
    }

    pub fn populated_inputs(&self) -> impl ExactSizeIterator<Item = (&TransactionInput, &UtxoEntry)> {
        self.tx.inputs.iter().zip(self.entries.iter())
    }

    pub fn populated_input(&self, index: usize) -> Result<(&TransactionInput, &UtxoEntry), PopulationError> {
        self.populated_inputs().nth(index).ok_or(PopulationError::InputIndexOutOfRange(index, self.tx.inputs.len()))
    }

    pub fn outputs(&self) -> &[TransactionOutput] {
        &self.tx.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn sample_tx() -> Transaction {
        Transaction::new(
            1,
            vec![
                TransactionInput::new(TransactionOutpoint::new(6.into(), 1), 0),
                TransactionInput::new(TransactionOutpoint::new(7.into(), 0), 3),
            ],
            vec![
                TransactionOutput::state_root(9.into()),
                TransactionOutput::new(330, ScriptPublicKey::new(0, vec![0x51, 0x52]), 10.into()),
                TransactionOutput::stateless(1000, ScriptPublicKey::new(0, vec![0x51])),
            ],
            0,
        )
    }

    #[test]
    fn test_wire_round_trip() {
        let tx = sample_tx();
        let bytes = tx.to_bytes();
        assert_eq!(Transaction::from_bytes(&bytes).unwrap(), tx);
        assert_eq!(Transaction::from_bytes(&bytes).unwrap().id(), tx.id());
    }

    #[test]
    fn test_trailing_and_truncated_bytes_are_rejected() {
        let mut bytes = sample_tx().to_bytes();
        bytes.push(0);
        assert!(matches!(Transaction::from_bytes(&bytes), Err(TxCodecError::Malformed(_))));
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(Transaction::from_bytes(&bytes), Err(TxCodecError::Malformed(_))));
    }

    #[test]
    fn test_corrupted_bytes_never_decode_to_original() {
        let tx = sample_tx();
        let bytes = tx.to_bytes();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let mut corrupted = bytes.clone();
            let i = rng.gen_range(0..bytes.len());
            corrupted[i] ^= rng.gen_range(1..=255u8);
            if let Ok(decoded) = Transaction::from_bytes(&corrupted) {
                assert_ne!(decoded, tx);
                assert_ne!(decoded.id(), tx.id());
            }
        }
    }

    #[test]
    fn test_too_many_outputs() {
        let mut tx = sample_tx();
        tx.outputs = vec![TransactionOutput::stateless(1, ScriptPublicKey::default()); TX_OUTPUT_COUNT_MAX + 1];
        assert_eq!(
            Transaction::from_bytes(&tx.to_bytes()),
            Err(TxCodecError::TooManyOutputs(TX_OUTPUT_COUNT_MAX + 1, TX_OUTPUT_COUNT_MAX))
        );
    }

    #[test]
    fn test_state_flags() {
        let tx = sample_tx();
        assert!(tx.outputs[0].script_public_key.is_state_root());
        assert!(tx.outputs[1].has_state());
        assert!(!tx.outputs[2].has_state());
    }

    #[test]
    fn test_committed_output() {
        let tx = sample_tx();
        let committed = CommittedOutput::from(&tx.outputs[1]);
        assert_eq!(committed, CommittedOutput::new(330, ScriptPublicKey::new(0, vec![0x51, 0x52]).script_hash(), 10.into()));
        assert_eq!(CommittedOutput::from(&tx.outputs[0]), CommittedOutput::state_root(9.into()));
        assert_eq!(CommittedOutput::from(&tx.outputs[2]).data, NO_STATE_HASH);
    }

    #[test]
    fn test_populated_transaction() {
        let tx = sample_tx();
        assert_eq!(PopulatedTransaction::new(&tx, vec![]).err(), Some(PopulationError::EntryCountMismatch(2, 0)));
        let entries = tx.outputs[1..].iter().map(UtxoEntry::from).collect();
        let populated = PopulatedTransaction::new(&tx, entries).unwrap();
        assert_eq!(populated.populated_input(1).unwrap().1.amount, 1000);
        assert_eq!(populated.populated_input(2).err(), Some(PopulationError::InputIndexOutOfRange(2, 2)));
    }
}
