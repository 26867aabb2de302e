use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use tessera_hashes::{Hash, HasherBase, TransactionSigningHash, ZERO_HASH};

use crate::{
    errors::PopulationError,
    tx::{CommittedOutput, PopulatedTransaction, TransactionOutpoint, TransactionOutput},
};

use super::{HasherExtensions, sighash_type::SigHashType};

/// The exact values hashed into the signing digest of one input.
///
/// Covenants receive these fields from the signature check and treat them as the ground truth
/// of the spending transaction: every witness a covenant consumes is ultimately checked
/// against one of them. Aggregate fields are replaced by [`ZERO_HASH`] under the signature
/// modes that opt out of committing to them.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigHashFields {
    pub version: u16,
    pub hash_prevouts: Hash,
    pub hash_sequences: Hash,
    pub hash_spent_amounts: Hash,
    pub hash_spent_script_hashes: Hash,
    pub hash_spent_data_hashes: Hash,
    pub outpoint: TransactionOutpoint,
    pub spent_script_hash: Hash,
    pub spent_data_hash: Hash,
    pub spent_amount: u64,
    pub sequence: u64,
    pub hash_outputs: Hash,
    pub input_index: u32,
    pub lock_time: u64,
    pub sighash_type: SigHashType,
}

impl SigHashFields {
    /// The digest signed by the owner of the input.
    pub fn signature_hash(&self) -> Hash {
        let mut hasher = TransactionSigningHash::new();
        hasher
            .write_u16(self.version)
            .update(self.hash_prevouts)
            .update(self.hash_sequences)
            .update(self.hash_spent_amounts)
            .update(self.hash_spent_script_hashes)
            .update(self.hash_spent_data_hashes);
        hash_outpoint(&mut hasher, &self.outpoint);
        hasher
            .update(self.spent_script_hash)
            .update(self.spent_data_hash)
            .write_u64(self.spent_amount)
            .write_u64(self.sequence)
            .update(self.hash_outputs)
            .write_u32(self.input_index)
            .write_u64(self.lock_time)
            .write_u8(self.sighash_type.to_u8());
        hasher.finalize()
    }
}

/// Aggregates shared by all inputs of a transaction, computed at most once.
#[derive(Default)]
pub struct SigHashReusedValues {
    prevouts_hash: Option<Hash>,
    sequences_hash: Option<Hash>,
    spent_amounts_hash: Option<Hash>,
    spent_script_hashes_hash: Option<Hash>,
    spent_data_hashes_hash: Option<Hash>,
    outputs_hash: Option<Hash>,
}

impl SigHashReusedValues {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn hash_prevouts<'a>(prevouts: impl IntoIterator<Item = &'a TransactionOutpoint>) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    for outpoint in prevouts {
        hash_outpoint(&mut hasher, outpoint);
    }
    hasher.finalize()
}

pub fn hash_sequences(sequences: impl IntoIterator<Item = u64>) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    for sequence in sequences {
        hasher.write_u64(sequence);
    }
    hasher.finalize()
}

pub fn hash_spent_amounts(amounts: impl IntoIterator<Item = u64>) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    for amount in amounts {
        hasher.write_u64(amount);
    }
    hasher.finalize()
}

/// Hash over a list of hashes. Used for both spent script hashes and spent data hashes.
pub fn hash_hash_list<'a>(hashes: impl IntoIterator<Item = &'a Hash>) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    for hash in hashes {
        hasher.update(hash);
    }
    hasher.finalize()
}

pub fn hash_outputs<'a>(outputs: impl IntoIterator<Item = &'a TransactionOutput>) -> Hash {
    let committed = outputs.into_iter().map(CommittedOutput::from).collect::<Vec<_>>();
    hash_committed_outputs(&committed)
}

/// The outputs hash as a covenant recomputes it from outputs it rebuilt itself.
pub fn hash_committed_outputs<'a>(outputs: impl IntoIterator<Item = &'a CommittedOutput>) -> Hash {
    let mut hasher = TransactionSigningHash::new();
    for output in outputs {
        hash_output(&mut hasher, output);
    }
    hasher.finalize()
}

fn hash_outpoint(hasher: &mut impl HasherBase, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).write_u32(outpoint.index);
}

fn hash_output(hasher: &mut impl HasherBase, output: &CommittedOutput) {
    hasher.write_u64(output.value).write_u16(output.script_version).update(output.script_hash).update(output.data);
}

fn prevouts_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if !hash_type.commits_to_all_inputs() {
        return ZERO_HASH;
    }
    *reused_values.prevouts_hash.get_or_insert_with(|| hash_prevouts(tx.tx.inputs.iter().map(|input| &input.previous_outpoint)))
}

fn sequences_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_single() || hash_type.is_sighash_anyone_can_pay() || hash_type.is_sighash_none() {
        return ZERO_HASH;
    }
    *reused_values.sequences_hash.get_or_insert_with(|| hash_sequences(tx.tx.inputs.iter().map(|input| input.sequence)))
}

fn spent_amounts_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if !hash_type.commits_to_all_inputs() {
        return ZERO_HASH;
    }
    *reused_values.spent_amounts_hash.get_or_insert_with(|| hash_spent_amounts(tx.entries.iter().map(|entry| entry.amount)))
}

fn spent_script_hashes_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if !hash_type.commits_to_all_inputs() {
        return ZERO_HASH;
    }
    *reused_values.spent_script_hashes_hash.get_or_insert_with(|| {
        let script_hashes = tx.entries.iter().map(|entry| entry.script_public_key.script_hash()).collect::<Vec<_>>();
        hash_hash_list(&script_hashes)
    })
}

fn spent_data_hashes_hash(tx: &PopulatedTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if !hash_type.commits_to_all_inputs() {
        return ZERO_HASH;
    }
    *reused_values.spent_data_hashes_hash.get_or_insert_with(|| hash_hash_list(tx.entries.iter().map(|entry| &entry.data)))
}

fn outputs_hash(
    tx: &PopulatedTransaction,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
    input_index: usize,
) -> Hash {
    if hash_type.is_sighash_none() {
        return ZERO_HASH;
    }

    if hash_type.is_sighash_single() {
        // If the relevant output exists - return its hash, otherwise return zero-hash
        return tx.outputs().get(input_index).map(|output| hash_outputs([output])).unwrap_or(ZERO_HASH);
    }

    // Otherwise, return hash of all outputs. Re-use hash if available.
    *reused_values.outputs_hash.get_or_insert_with(|| hash_outputs(tx.outputs()))
}

/// Computes the signing-digest fields of `input_index`. This is the off-chain side of the
/// digest; covenants only ever see the resulting [`SigHashFields`].
pub fn calc_sighash_fields(
    tx: &PopulatedTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Result<SigHashFields, PopulationError> {
    let (input, entry) = tx.populated_input(input_index)?;
    Ok(SigHashFields {
        version: tx.tx.version,
        hash_prevouts: prevouts_hash(tx, hash_type, reused_values),
        hash_sequences: sequences_hash(tx, hash_type, reused_values),
        hash_spent_amounts: spent_amounts_hash(tx, hash_type, reused_values),
        hash_spent_script_hashes: spent_script_hashes_hash(tx, hash_type, reused_values),
        hash_spent_data_hashes: spent_data_hashes_hash(tx, hash_type, reused_values),
        outpoint: input.previous_outpoint,
        spent_script_hash: entry.script_public_key.script_hash(),
        spent_data_hash: entry.data,
        spent_amount: entry.amount,
        sequence: input.sequence,
        hash_outputs: outputs_hash(tx, hash_type, reused_values, input_index),
        input_index: input_index as u32,
        lock_time: tx.tx.lock_time,
        sighash_type: hash_type,
    })
}

pub fn calc_signature_hash(
    tx: &PopulatedTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Result<Hash, PopulationError> {
    Ok(calc_sighash_fields(tx, input_index, hash_type, reused_values)?.signature_hash())
}
