use borsh::{BorshDeserialize, BorshSerialize};
use tessera_consensus_core::{
    config::constants::{
        GUARD_LARGE_INPUT_COUNT, GUARD_LARGE_OUTPUT_COUNT, GUARD_SMALL_INPUT_COUNT, GUARD_SMALL_OUTPUT_COUNT, GUARD_TOKEN_TYPE_MAX,
        SENTINEL_TYPE_INDEX,
    },
    state::{FtState, StateRecord},
};
use tessera_core::{debug, trace};
use tessera_hashes::Hash;
use tessera_txscript_errors::{VerificationError, VerificationResult};

use super::{GuardState, OutputClaims, check_type_table, classify_inputs, resolve_type_index, type_placeholder, verify_outputs};
use crate::{
    context::SpendContext,
    state::{StateHashes, verify_self_state},
};

/// State of a fungible guard. Per type: the token script hash, the total input amount and the
/// amount burned. Per input slot: the type index, or `-1`.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FtGuardState<const TYPES: usize, const INPUTS: usize> {
    pub token_script_hashes: [Hash; TYPES],
    pub token_amounts: [i64; TYPES],
    pub token_burn_amounts: [i64; TYPES],
    pub token_script_indexes: [i8; INPUTS],
}

impl<const TYPES: usize, const INPUTS: usize> FtGuardState<TYPES, INPUTS> {
    /// An empty state accounting for the given token scripts. Remaining type slots hold their
    /// placeholders.
    pub fn new(token_script_hashes: &[Hash]) -> Self {
        const { assert!(TYPES < i8::MAX as usize) };
        Self {
            token_script_hashes: std::array::from_fn(|slot| {
                token_script_hashes.get(slot).copied().unwrap_or_else(|| type_placeholder(slot))
            }),
            token_amounts: [0; TYPES],
            token_burn_amounts: [0; TYPES],
            token_script_indexes: [SENTINEL_TYPE_INDEX; INPUTS],
        }
    }

    /// Declares input `input_index` as a token of `type_index` carrying `amount`.
    pub fn add_input(&mut self, input_index: usize, type_index: usize, amount: i64) -> &mut Self {
        const { assert!(TYPES < i8::MAX as usize) };
        self.token_amounts[type_index] += amount;
        self.token_script_indexes[input_index] = type_index as i8;
        self
    }

    pub fn burn(&mut self, type_index: usize, amount: i64) -> &mut Self {
        self.token_burn_amounts[type_index] += amount;
        self
    }
}

impl<const TYPES: usize, const INPUTS: usize> StateRecord for FtGuardState<TYPES, INPUTS> {
    const KIND: u8 = 5;
}

impl<const TYPES: usize, const INPUTS: usize> GuardState for FtGuardState<TYPES, INPUTS> {
    fn type_script_hash(&self, input_index: usize) -> Option<Hash> {
        let type_index = *self.token_script_indexes.get(input_index)?;
        resolve_type_index(&self.token_script_hashes, input_index, type_index).ok().flatten().map(|t| self.token_script_hashes[t])
    }
}

/// Everything a fungible guard spend supplies besides the signing-digest fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtGuardWitness<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize> {
    pub state: FtGuardState<TYPES, INPUTS>,
    /// The state of every token input, `None` elsewhere.
    pub input_states: [Option<FtState>; INPUTS],
    pub outputs: OutputClaims<OUTPUTS>,
    pub state_hashes: StateHashes,
}

pub type SmallFtGuardWitness = FtGuardWitness<GUARD_TOKEN_TYPE_MAX, GUARD_SMALL_INPUT_COUNT, GUARD_SMALL_OUTPUT_COUNT>;
pub type LargeFtGuardWitness = FtGuardWitness<GUARD_TOKEN_TYPE_MAX, GUARD_LARGE_INPUT_COUNT, GUARD_LARGE_OUTPUT_COUNT>;

/// Accepts iff, per type, the token inputs sum to the declared amount and to the claimed
/// outputs plus the declared burn, with every amount non-negative.
pub fn verify_ft_guard<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize>(
    ctx: &SpendContext<INPUTS>,
    witness: &FtGuardWitness<TYPES, INPUTS, OUTPUTS>,
) -> VerificationResult<()> {
    let result = verify_ft_guard_inner(ctx, witness);
    match &result {
        Ok(()) => trace!("fungible guard at input {} accepted", ctx.input_index()),
        Err(err) => debug!("fungible guard at input {} rejected ({:?}): {}", ctx.input_index(), err.reason(), err),
    }
    result
}

fn verify_ft_guard_inner<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize>(
    ctx: &SpendContext<INPUTS>,
    witness: &FtGuardWitness<TYPES, INPUTS, OUTPUTS>,
) -> VerificationResult<()> {
    const { assert!(TYPES < i8::MAX as usize) };
    let state = &witness.state;
    let table = &state.token_script_hashes;
    verify_self_state(ctx.fields(), state)?;
    check_type_table(table)?;
    let types = classify_inputs(ctx, table, &state.token_script_indexes)?;

    let mut input_sums = [0i128; TYPES];
    for (i, (declared, input_state)) in types.iter().zip(witness.input_states.iter()).enumerate() {
        match (declared, input_state) {
            (Some(t), Some(input_state)) => {
                if input_state.state_hash() != ctx.spent_data_hash(i)? {
                    return Err(VerificationError::InputStateMismatch(i));
                }
                if input_state.amount < 0 {
                    return Err(VerificationError::NegativeAmount);
                }
                input_sums[*t] += input_state.amount as i128;
            }
            (Some(_), None) => return Err(VerificationError::MissingInputState(i)),
            (None, Some(_)) => return Err(VerificationError::NonSentinelPadding("input states", i)),
            (None, None) => {}
        }
    }

    for t in 0..TYPES {
        let (declared, burned) = (state.token_amounts[t], state.token_burn_amounts[t]);
        if declared < 0 || burned < 0 {
            return Err(VerificationError::NegativeAmount);
        }
        if table[t] == type_placeholder(t) && (declared != 0 || burned != 0) {
            return Err(VerificationError::NonSentinelPadding("token amounts", t));
        }
        if input_sums[t] != declared as i128 {
            return Err(VerificationError::DeclaredAmountMismatch(t));
        }
    }

    let tokens = verify_outputs(ctx.fields(), table, &witness.outputs, &witness.state_hashes, |token| {
        if token.value < 0 {
            return Err(VerificationError::NegativeAmount);
        }
        Ok(FtState { owner: token.owner, amount: token.value }.state_hash())
    })?;

    let mut output_sums = [0i128; TYPES];
    for token in tokens.iter().flatten() {
        output_sums[token.type_index] += token.value as i128;
    }
    for t in 0..TYPES {
        let burned = state.token_burn_amounts[t] as i128;
        if input_sums[t] != output_sums[t] + burned {
            return Err(VerificationError::AmountMismatch { type_index: t, inputs: input_sums[t], outputs: output_sums[t], burned });
        }
    }
    Ok(())
}
