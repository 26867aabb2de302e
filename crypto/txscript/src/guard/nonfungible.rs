use borsh::{BorshDeserialize, BorshSerialize};
use itertools::Itertools;
use tessera_consensus_core::{
    config::constants::{
        GUARD_LARGE_INPUT_COUNT, GUARD_LARGE_OUTPUT_COUNT, GUARD_SMALL_INPUT_COUNT, GUARD_SMALL_OUTPUT_COUNT, GUARD_TOKEN_TYPE_MAX,
        SENTINEL_TYPE_INDEX,
    },
    state::{NftState, StateRecord},
};
use tessera_core::{debug, trace};
use tessera_hashes::Hash;
use tessera_txscript_errors::{VerificationError, VerificationResult};

use super::{GuardState, OutputClaims, check_type_table, classify_inputs, resolve_type_index, type_placeholder, verify_outputs};
use crate::{
    context::SpendContext,
    state::{StateHashes, verify_self_state},
};

/// State of a non-fungible guard. Per type: the collection script hash. Per input slot: the
/// type index (or `-1`) and whether the identity is burned.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct NftGuardState<const TYPES: usize, const INPUTS: usize> {
    pub nft_script_hashes: [Hash; TYPES],
    pub nft_burn_masks: [bool; INPUTS],
    pub nft_script_indexes: [i8; INPUTS],
}

impl<const TYPES: usize, const INPUTS: usize> NftGuardState<TYPES, INPUTS> {
    pub fn new(nft_script_hashes: &[Hash]) -> Self {
        const { assert!(TYPES < i8::MAX as usize) };
        Self {
            nft_script_hashes: std::array::from_fn(|slot| {
                nft_script_hashes.get(slot).copied().unwrap_or_else(|| type_placeholder(slot))
            }),
            nft_burn_masks: [false; INPUTS],
            nft_script_indexes: [SENTINEL_TYPE_INDEX; INPUTS],
        }
    }

    pub fn add_input(&mut self, input_index: usize, type_index: usize, burn: bool) -> &mut Self {
        const { assert!(TYPES < i8::MAX as usize) };
        self.nft_script_indexes[input_index] = type_index as i8;
        self.nft_burn_masks[input_index] = burn;
        self
    }
}

impl<const TYPES: usize, const INPUTS: usize> StateRecord for NftGuardState<TYPES, INPUTS> {
    const KIND: u8 = 6;
}

impl<const TYPES: usize, const INPUTS: usize> GuardState for NftGuardState<TYPES, INPUTS> {
    fn type_script_hash(&self, input_index: usize) -> Option<Hash> {
        let type_index = *self.nft_script_indexes.get(input_index)?;
        resolve_type_index(&self.nft_script_hashes, input_index, type_index).ok().flatten().map(|t| self.nft_script_hashes[t])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftGuardWitness<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize> {
    pub state: NftGuardState<TYPES, INPUTS>,
    pub input_states: [Option<NftState>; INPUTS],
    /// `values` of token outputs are local ids.
    pub outputs: OutputClaims<OUTPUTS>,
    pub state_hashes: StateHashes,
}

pub type SmallNftGuardWitness = NftGuardWitness<GUARD_TOKEN_TYPE_MAX, GUARD_SMALL_INPUT_COUNT, GUARD_SMALL_OUTPUT_COUNT>;
pub type LargeNftGuardWitness = NftGuardWitness<GUARD_TOKEN_TYPE_MAX, GUARD_LARGE_INPUT_COUNT, GUARD_LARGE_OUTPUT_COUNT>;

/// Accepts iff, per collection, the claimed output identities are exactly the non-burned input
/// identities in input order.
pub fn verify_nft_guard<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize>(
    ctx: &SpendContext<INPUTS>,
    witness: &NftGuardWitness<TYPES, INPUTS, OUTPUTS>,
) -> VerificationResult<()> {
    let result = verify_nft_guard_inner(ctx, witness);
    match &result {
        Ok(()) => trace!("nft guard at input {} accepted", ctx.input_index()),
        Err(err) => debug!("nft guard at input {} rejected ({:?}): {}", ctx.input_index(), err.reason(), err),
    }
    result
}

fn verify_nft_guard_inner<const TYPES: usize, const INPUTS: usize, const OUTPUTS: usize>(
    ctx: &SpendContext<INPUTS>,
    witness: &NftGuardWitness<TYPES, INPUTS, OUTPUTS>,
) -> VerificationResult<()> {
    const { assert!(TYPES < i8::MAX as usize) };
    let state = &witness.state;
    let table = &state.nft_script_hashes;
    verify_self_state(ctx.fields(), state)?;
    check_type_table(table)?;
    let types = classify_inputs(ctx, table, &state.nft_script_indexes)?;

    // Per collection, the identities which move on and those which burn, in input order
    let mut kept = [[0i64; INPUTS]; TYPES];
    let mut kept_counts = [0usize; TYPES];
    let mut burned = [[0i64; INPUTS]; TYPES];
    let mut burned_counts = [0usize; TYPES];
    for (i, (declared, input_state)) in types.iter().zip(witness.input_states.iter()).enumerate() {
        match (declared, input_state) {
            (Some(t), Some(input_state)) => {
                if input_state.state_hash() != ctx.spent_data_hash(i)? {
                    return Err(VerificationError::InputStateMismatch(i));
                }
                if input_state.local_id < 0 {
                    return Err(VerificationError::LocalIdOutOfRange(input_state.local_id));
                }
                let (ids, count) = if state.nft_burn_masks[i] {
                    (&mut burned[*t], &mut burned_counts[*t])
                } else {
                    (&mut kept[*t], &mut kept_counts[*t])
                };
                ids[*count] = input_state.local_id;
                *count += 1;
            }
            (Some(_), None) => return Err(VerificationError::MissingInputState(i)),
            (None, Some(_)) => return Err(VerificationError::NonSentinelPadding("input states", i)),
            (None, None) => {
                if state.nft_burn_masks[i] {
                    return Err(VerificationError::NonSentinelPadding("burn masks", i));
                }
            }
        }
    }

    // An identity may appear once per collection, whether it moves on or burns
    for t in 0..TYPES {
        if !kept[t][..kept_counts[t]].iter().chain(burned[t][..burned_counts[t]].iter()).all_unique() {
            return Err(VerificationError::NftMismatch);
        }
    }

    let tokens = verify_outputs(ctx.fields(), table, &witness.outputs, &witness.state_hashes, |token| {
        if token.value < 0 {
            return Err(VerificationError::LocalIdOutOfRange(token.value));
        }
        Ok(NftState { owner: token.owner, local_id: token.value }.state_hash())
    })?;

    // Output identities consume the kept identities of their collection in order
    let mut matched = [0usize; TYPES];
    for token in tokens.iter().flatten() {
        let t = token.type_index;
        if kept[t][..kept_counts[t]].get(matched[t]) != Some(&token.value) {
            return Err(VerificationError::NftMismatch);
        }
        matched[t] += 1;
    }
    for t in 0..TYPES {
        let inputs = kept_counts[t] + burned_counts[t];
        if matched[t] != kept_counts[t] || inputs != matched[t] + burned_counts[t] {
            return Err(VerificationError::NftCountMismatch);
        }
    }
    Ok(())
}
