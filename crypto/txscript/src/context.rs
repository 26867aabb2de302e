//!
//! Witness-backed view of the inputs of the spending transaction.
//!
//! A covenant only sees its own signing-digest fields. Anything it needs to know about other
//! inputs is supplied as witness data and accepted only after it rehashes to the aggregates
//! those fields commit to.
//!

use tessera_consensus_core::{
    hashing::sighash::{SigHashFields, hash_hash_list, hash_prevouts, hash_spent_amounts},
    tx::{PopulatedTransaction, TransactionOutpoint},
};
use tessera_hashes::{Hash, ZERO_HASH};
use tessera_txscript_errors::{VerificationError, VerificationResult};

/// Per-input data of the spending transaction, padded to `INPUTS` slots. Slots at or beyond
/// `input_count` hold the default outpoint, [`ZERO_HASH`] and zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputsWitness<const INPUTS: usize> {
    pub input_count: usize,
    pub prevouts: [TransactionOutpoint; INPUTS],
    pub spent_script_hashes: [Hash; INPUTS],
    pub spent_data_hashes: [Hash; INPUTS],
    pub spent_amounts: [u64; INPUTS],
}

impl<const INPUTS: usize> InputsWitness<INPUTS> {
    /// Builds the witness of a populated transaction. Used by spenders off-chain.
    pub fn from_populated(tx: &PopulatedTransaction) -> VerificationResult<Self> {
        let input_count = tx.tx.inputs.len();
        if input_count == 0 || input_count > INPUTS {
            return Err(VerificationError::InputCountOutOfRange(input_count, INPUTS));
        }
        let mut witness = Self {
            input_count,
            prevouts: [TransactionOutpoint::default(); INPUTS],
            spent_script_hashes: [ZERO_HASH; INPUTS],
            spent_data_hashes: [ZERO_HASH; INPUTS],
            spent_amounts: [0; INPUTS],
        };
        for (i, (input, entry)) in tx.populated_inputs().enumerate() {
            witness.prevouts[i] = input.previous_outpoint;
            witness.spent_script_hashes[i] = entry.script_public_key.script_hash();
            witness.spent_data_hashes[i] = entry.data;
            witness.spent_amounts[i] = entry.amount;
        }
        Ok(witness)
    }
}

/// Inputs of the spending transaction, confirmed against the signed aggregates.
#[derive(Debug)]
pub struct SpendContext<'a, const INPUTS: usize> {
    fields: &'a SigHashFields,
    witness: InputsWitness<INPUTS>,
}

impl<'a, const INPUTS: usize> SpendContext<'a, INPUTS> {
    pub fn new(fields: &'a SigHashFields, witness: InputsWitness<INPUTS>) -> VerificationResult<Self> {
        if !fields.sighash_type.commits_to_all_inputs() {
            return Err(VerificationError::AggregateUnavailable);
        }

        let count = witness.input_count;
        if count == 0 || count > INPUTS {
            return Err(VerificationError::InputCountOutOfRange(count, INPUTS));
        }
        let input_index = fields.input_index as usize;
        if input_index >= count {
            return Err(VerificationError::InputIndexOutOfRange(input_index, count));
        }

        for i in count..INPUTS {
            if witness.prevouts[i] != TransactionOutpoint::default()
                || witness.spent_script_hashes[i] != ZERO_HASH
                || witness.spent_data_hashes[i] != ZERO_HASH
                || witness.spent_amounts[i] != 0
            {
                return Err(VerificationError::NonSentinelPadding("inputs", i));
            }
        }

        if hash_prevouts(&witness.prevouts[..count]) != fields.hash_prevouts {
            return Err(VerificationError::AggregateMismatch("prevouts"));
        }
        if hash_hash_list(&witness.spent_script_hashes[..count]) != fields.hash_spent_script_hashes {
            return Err(VerificationError::AggregateMismatch("spent script hashes"));
        }
        if hash_hash_list(&witness.spent_data_hashes[..count]) != fields.hash_spent_data_hashes {
            return Err(VerificationError::AggregateMismatch("spent data hashes"));
        }
        if hash_spent_amounts(witness.spent_amounts[..count].iter().copied()) != fields.hash_spent_amounts {
            return Err(VerificationError::AggregateMismatch("spent amounts"));
        }

        // The executing input's own fields must agree with its slot
        if witness.prevouts[input_index] != fields.outpoint
            || witness.spent_script_hashes[input_index] != fields.spent_script_hash
            || witness.spent_data_hashes[input_index] != fields.spent_data_hash
            || witness.spent_amounts[input_index] != fields.spent_amount
        {
            return Err(VerificationError::AggregateMismatch("executing input fields"));
        }

        Ok(Self { fields, witness })
    }

    pub fn fields(&self) -> &'a SigHashFields {
        self.fields
    }

    pub fn input_count(&self) -> usize {
        self.witness.input_count
    }

    pub fn input_index(&self) -> usize {
        self.fields.input_index as usize
    }

    pub fn spent_script_hash(&self, index: usize) -> VerificationResult<Hash> {
        self.check_index(index).map(|i| self.witness.spent_script_hashes[i])
    }

    pub fn spent_data_hash(&self, index: usize) -> VerificationResult<Hash> {
        self.check_index(index).map(|i| self.witness.spent_data_hashes[i])
    }

    pub fn spent_amount(&self, index: usize) -> VerificationResult<u64> {
        self.check_index(index).map(|i| self.witness.spent_amounts[i])
    }

    /// Spent script hashes of the real inputs, in input order.
    pub fn spent_script_hashes(&self) -> &[Hash] {
        &self.witness.spent_script_hashes[..self.witness.input_count]
    }

    fn check_index(&self, index: usize) -> VerificationResult<usize> {
        let count = self.witness.input_count;
        if index < count { Ok(index) } else { Err(VerificationError::InputIndexOutOfRange(index, count)) }
    }
}

/// Checks that rebuild outputs compare against the full outputs hash, which only the
/// all-outputs signature mode commits to.
pub fn require_all_outputs(fields: &SigHashFields) -> VerificationResult<()> {
    if fields.sighash_type.commits_to_all_outputs() { Ok(()) } else { Err(VerificationError::AggregateUnavailable) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_consensus_core::{
        hashing::sighash_type::{SIG_HASH_ALL, SIG_HASH_ANY_ONE_CAN_PAY, SIG_HASH_SINGLE, SigHashType},
        testutils::{create_transaction::*, scripts::covenant_script},
        tx::{Transaction, TransactionOutput, UtxoEntry},
    };

    fn sample() -> (Transaction, Vec<UtxoEntry>) {
        let funding = create_funding_transaction(
            1,
            vec![
                TransactionOutput::new(10, covenant_script("token"), 5.into()),
                create_fee_output(1000),
                TransactionOutput::new(20, covenant_script("guard"), 6.into()),
            ],
        );
        spend_outputs(&[(&funding, 0), (&funding, 1), (&funding, 2)], vec![create_fee_output(1030)])
    }

    #[test]
    fn test_honest_witness_accepted() {
        let (tx, entries) = sample();
        let populated = populate(&tx, entries);
        let fields = sighash_fields(&populated, 2);
        let witness = InputsWitness::<6>::from_populated(&populated).unwrap();
        let ctx = SpendContext::new(&fields, witness).unwrap();
        assert_eq!(ctx.input_count(), 3);
        assert_eq!(ctx.input_index(), 2);
        assert_eq!(ctx.spent_script_hash(0).unwrap(), covenant_script("token").script_hash());
        assert_eq!(ctx.spent_amount(1).unwrap(), 1000);
        assert_eq!(ctx.spent_data_hash(3), Err(VerificationError::InputIndexOutOfRange(3, 3)));
        assert_eq!(ctx.spent_script_hashes().len(), 3);
    }

    #[test]
    fn test_tampered_witness_rejected() {
        let (tx, entries) = sample();
        let populated = populate(&tx, entries);
        let fields = sighash_fields(&populated, 0);
        let honest = InputsWitness::<6>::from_populated(&populated).unwrap();

        let mut witness = honest.clone();
        witness.spent_amounts[1] += 1;
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::AggregateMismatch("spent amounts")));

        let mut witness = honest.clone();
        witness.spent_data_hashes[2] = 7.into();
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::AggregateMismatch("spent data hashes")));

        let mut witness = honest.clone();
        witness.spent_script_hashes.swap(0, 2);
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::AggregateMismatch("spent script hashes")));

        let mut witness = honest.clone();
        witness.prevouts[0].index = 9;
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::AggregateMismatch("prevouts")));

        let mut witness = honest.clone();
        witness.spent_amounts[4] = 1;
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::NonSentinelPadding("inputs", 4)));

        let mut witness = honest;
        witness.input_count = 2;
        assert!(SpendContext::new(&fields, witness).is_err());
    }

    #[test]
    fn test_capacity_and_modes() {
        let (tx, entries) = sample();
        let populated = populate(&tx, entries);
        assert_eq!(InputsWitness::<2>::from_populated(&populated).err(), Some(VerificationError::InputCountOutOfRange(3, 2)));

        let acp = SigHashType::from_u8(SIG_HASH_ALL.to_u8() | SIG_HASH_ANY_ONE_CAN_PAY.to_u8()).unwrap();
        let fields = sighash_fields_with_type(&populated, 0, acp);
        let witness = InputsWitness::<6>::from_populated(&populated).unwrap();
        assert_eq!(SpendContext::new(&fields, witness).err(), Some(VerificationError::AggregateUnavailable));
        assert!(require_all_outputs(&fields).is_ok());

        let fields = sighash_fields_with_type(&populated, 0, SIG_HASH_SINGLE);
        assert_eq!(require_all_outputs(&fields), Err(VerificationError::AggregateUnavailable));
    }
}
