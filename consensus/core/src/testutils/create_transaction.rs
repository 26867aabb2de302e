use crate::{
    hashing::{
        sighash::{SigHashFields, SigHashReusedValues, calc_sighash_fields},
        sighash_type::{SIG_HASH_ALL, SigHashType},
    },
    tx::{PopulatedTransaction, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput, UtxoEntry},
};

use super::scripts::op_true_script;

/// Creates a version 0 transaction spending `previous_outpoints` with zero sequences.
pub fn create_transaction(previous_outpoints: &[TransactionOutpoint], outputs: Vec<TransactionOutput>) -> Transaction {
    let inputs = previous_outpoints.iter().map(|&outpoint| TransactionInput::new(outpoint, 0)).collect();
    Transaction::new(0, inputs, outputs, 0)
}

/// Creates a transaction out of thin air: it spends a made-up outpoint derived from `seed`.
/// Useful as the root of a test ledger.
pub fn create_funding_transaction(seed: u64, outputs: Vec<TransactionOutput>) -> Transaction {
    create_transaction(&[TransactionOutpoint::new(seed.into(), 0)], outputs)
}

/// A plain output paying `value` to the anyone-can-spend script.
pub fn create_fee_output(value: u64) -> TransactionOutput {
    TransactionOutput::stateless(value, op_true_script())
}

/// Spends the listed `(transaction, output index)` pairs into `outputs`, returning the new
/// transaction along with the utxo entries its inputs spend.
pub fn spend_outputs(spent: &[(&Transaction, u32)], outputs: Vec<TransactionOutput>) -> (Transaction, Vec<UtxoEntry>) {
    let outpoints = spent.iter().map(|(tx, index)| tx.outpoint(*index)).collect::<Vec<_>>();
    let entries = spent.iter().map(|(tx, index)| UtxoEntry::from(&tx.outputs[*index as usize])).collect();
    (create_transaction(&outpoints, outputs), entries)
}

pub fn populate(tx: &Transaction, entries: Vec<UtxoEntry>) -> PopulatedTransaction<'_> {
    PopulatedTransaction::new(tx, entries).expect("one entry per input")
}

/// Signing-digest fields of `input_index` under `SIG_HASH_ALL`.
pub fn sighash_fields(tx: &PopulatedTransaction, input_index: usize) -> SigHashFields {
    sighash_fields_with_type(tx, input_index, SIG_HASH_ALL)
}

pub fn sighash_fields_with_type(tx: &PopulatedTransaction, input_index: usize, hash_type: SigHashType) -> SigHashFields {
    calc_sighash_fields(tx, input_index, hash_type, &mut SigHashReusedValues::new()).expect("input index in range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::scripts::covenant_script;
    use tessera_hashes::Hash;

    #[test]
    fn test_spend_outputs() {
        let funding =
            create_funding_transaction(1, vec![create_fee_output(500), TransactionOutput::new(10, covenant_script("a"), 7.into())]);
        let (tx, entries) = spend_outputs(&[(&funding, 1), (&funding, 0)], vec![create_fee_output(490)]);
        assert_eq!(tx.inputs[0].previous_outpoint, funding.outpoint(1));
        assert_eq!(entries[0].data, Hash::from(7u64));
        assert_eq!(entries[1].amount, 500);

        let populated = populate(&tx, entries);
        let fields = sighash_fields(&populated, 0);
        assert_eq!(fields.spent_script_hash, covenant_script("a").script_hash());
        assert_eq!(fields.outpoint, funding.outpoint(1));
    }
}
