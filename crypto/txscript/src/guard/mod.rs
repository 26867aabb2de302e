//!
//! Guard conservation checker.
//!
//! Token outputs are never spent alone: every token transfer co-spends a guard, and the guard
//! checks in one evaluation that the token inputs of up to `TYPES` types balance against the
//! claimed token outputs plus declared burns. Authorization stays with the token covenants;
//! the guard only checks conservation.
//!
//! All witness arrays have a compile-time capacity. Unused slots carry sentinels which are
//! checked by value, so a witness can never smuggle data through padding.
//!

pub mod fungible;
pub mod nonfungible;

use itertools::Itertools;
use tessera_consensus_core::{
    config::constants::{SENTINEL_TYPE_INDEX, STATE_OUTPUT_COUNT_MAX, TX_OUTPUT_COUNT_MAX},
    hashing::sighash::{SigHashFields, hash_committed_outputs},
    state::{OwnerAddress, StateRecord},
    tx::CommittedOutput,
};
use tessera_hashes::{HASH_SIZE, Hash};
use tessera_txscript_errors::{VerificationError, VerificationResult};

use crate::{
    context::{SpendContext, require_all_outputs},
    state::{StateHashes, check_output_state, state_hash_root},
};

pub use fungible::{FtGuardState, FtGuardWitness, LargeFtGuardWitness, SmallFtGuardWitness, verify_ft_guard};
pub use nonfungible::{LargeNftGuardWitness, NftGuardState, NftGuardWitness, SmallNftGuardWitness, verify_nft_guard};

/// Script hash held by unused type slot `slot`. Distinct per slot so that unused slots never
/// look like duplicates of each other.
pub fn type_placeholder(slot: usize) -> Hash {
    let mut bytes = [0xff; HASH_SIZE];
    bytes[..8].copy_from_slice(&(!(slot as u64)).to_le_bytes());
    Hash::from_bytes(bytes)
}

/// Guard states expose which token type each input slot is declared as, so token covenants
/// can confirm the guard accounts for them.
pub trait GuardState: StateRecord {
    fn type_script_hash(&self, input_index: usize) -> Option<Hash>;
}

/// Where a claimed output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Unused,
    /// Owner of a token output.
    Owner(OwnerAddress),
    /// Script hash a plain output pays to.
    Script(Hash),
}

/// Claimed outputs of the guarded transaction, excluding the state root output. Output slot
/// `j` describes transaction output `j + 1`.
///
/// Token outputs carry their owner, a type index and the amount (or local id). Plain outputs
/// carry the script hash they pay to and [`SENTINEL_TYPE_INDEX`]. Slots at or beyond
/// `output_count` are [`OutputTarget::Unused`] with zero values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputClaims<const OUTPUTS: usize> {
    pub output_count: usize,
    pub targets: [OutputTarget; OUTPUTS],
    pub type_indexes: [i8; OUTPUTS],
    pub values: [i64; OUTPUTS],
    pub satoshis: [u64; OUTPUTS],
}

impl<const OUTPUTS: usize> Default for OutputClaims<OUTPUTS> {
    fn default() -> Self {
        Self {
            output_count: 0,
            targets: [OutputTarget::Unused; OUTPUTS],
            type_indexes: [SENTINEL_TYPE_INDEX; OUTPUTS],
            values: [0; OUTPUTS],
            satoshis: [0; OUTPUTS],
        }
    }
}

impl<const OUTPUTS: usize> OutputClaims<OUTPUTS> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_token(&mut self, owner: OwnerAddress, type_index: i8, value: i64, satoshis: u64) -> VerificationResult<()> {
        let slot = self.next_slot()?;
        self.targets[slot] = OutputTarget::Owner(owner);
        self.type_indexes[slot] = type_index;
        self.values[slot] = value;
        self.satoshis[slot] = satoshis;
        Ok(())
    }

    pub fn push_plain(&mut self, script_hash: Hash, satoshis: u64) -> VerificationResult<()> {
        let slot = self.next_slot()?;
        self.targets[slot] = OutputTarget::Script(script_hash);
        self.satoshis[slot] = satoshis;
        Ok(())
    }

    fn next_slot(&mut self) -> VerificationResult<usize> {
        if self.output_count >= OUTPUTS {
            return Err(VerificationError::OutputCountOutOfRange(self.output_count + 1, OUTPUTS));
        }
        self.output_count += 1;
        Ok(self.output_count - 1)
    }
}

/// A claimed token output which passed the state commitment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TokenOutput {
    pub type_index: usize,
    pub owner: OwnerAddress,
    pub value: i64,
}

fn is_used_type(table: &[Hash], slot: usize) -> bool {
    table[slot] != type_placeholder(slot)
}

/// Used entries must be pairwise distinct. Unused entries hold their slot placeholder.
pub(crate) fn check_type_table(table: &[Hash]) -> VerificationResult<()> {
    let used = (0..table.len()).filter(|&slot| is_used_type(table, slot)).map(|slot| table[slot]);
    if !used.clone().all_unique() {
        return Err(VerificationError::MalformedTypeTable("duplicate token script".to_string()));
    }
    if used.count() == 0 {
        return Err(VerificationError::MalformedTypeTable("no token script".to_string()));
    }
    Ok(())
}

/// Maps a declared type index to a used type slot. `-1` maps to `None`.
pub(crate) fn resolve_type_index(table: &[Hash], slot: usize, type_index: i8) -> VerificationResult<Option<usize>> {
    if type_index == SENTINEL_TYPE_INDEX {
        return Ok(None);
    }
    match usize::try_from(type_index) {
        Ok(t) if t < table.len() && is_used_type(table, t) => Ok(Some(t)),
        _ => Err(VerificationError::InvalidTypeIndex(slot, type_index)),
    }
}

/// Resolves the declared type of every input slot and checks it against the spent scripts.
pub(crate) fn classify_inputs<const INPUTS: usize>(
    ctx: &SpendContext<INPUTS>,
    table: &[Hash],
    type_indexes: &[i8; INPUTS],
) -> VerificationResult<[Option<usize>; INPUTS]> {
    let mut types = [None; INPUTS];
    for (i, &type_index) in type_indexes.iter().enumerate() {
        if i >= ctx.input_count() {
            if type_index != SENTINEL_TYPE_INDEX {
                return Err(VerificationError::NonSentinelPadding("type indexes", i));
            }
            continue;
        }
        let resolved = resolve_type_index(table, i, type_index)?;
        let spent_script_hash = ctx.spent_script_hash(i)?;
        match resolved {
            Some(_) if i == ctx.input_index() => return Err(VerificationError::GuardSelfSlot),
            Some(t) if table[t] != spent_script_hash => return Err(VerificationError::TypeScriptMismatch(i)),
            Some(_) => {}
            None => {
                if (0..table.len()).any(|slot| is_used_type(table, slot) && table[slot] == spent_script_hash) {
                    return Err(VerificationError::UntypedTokenInput(i));
                }
            }
        }
        types[i] = resolved;
    }
    Ok(types)
}

/// Rebuilds the outputs of the guarded transaction from the claims and compares them with the
/// signed outputs hash. `token_state_hash` turns a claimed token output into its state hash.
/// Returns the claimed token outputs by output slot.
pub(crate) fn verify_outputs<const OUTPUTS: usize>(
    fields: &SigHashFields,
    table: &[Hash],
    claims: &OutputClaims<OUTPUTS>,
    state_hashes: &StateHashes,
    mut token_state_hash: impl FnMut(&TokenOutput) -> VerificationResult<Hash>,
) -> VerificationResult<[Option<TokenOutput>; OUTPUTS]> {
    const { assert!(OUTPUTS <= STATE_OUTPUT_COUNT_MAX) };
    require_all_outputs(fields)?;

    let count = claims.output_count;
    if count > OUTPUTS {
        return Err(VerificationError::OutputCountOutOfRange(count, OUTPUTS));
    }

    let root = state_hash_root(state_hashes);
    let mut outputs = [CommittedOutput::state_root(root); TX_OUTPUT_COUNT_MAX];
    let mut tokens = [None; OUTPUTS];

    for j in 0..OUTPUTS {
        let target = claims.targets[j];
        if j >= count {
            if target != OutputTarget::Unused
                || claims.type_indexes[j] != SENTINEL_TYPE_INDEX
                || claims.values[j] != 0
                || claims.satoshis[j] != 0
            {
                return Err(VerificationError::NonSentinelPadding("outputs", j));
            }
            continue;
        }

        let index = j + 1;
        match (resolve_type_index(table, j, claims.type_indexes[j])?, target) {
            (Some(type_index), OutputTarget::Owner(owner)) => {
                let token = TokenOutput { type_index, owner, value: claims.values[j] };
                let state_hash = token_state_hash(&token)?;
                check_output_state(root, state_hashes, state_hash, index)?;
                outputs[index] = CommittedOutput::new(claims.satoshis[j], table[type_index], state_hash);
                tokens[j] = Some(token);
            }
            (None, OutputTarget::Script(script_hash)) => {
                if claims.values[j] != 0 {
                    return Err(VerificationError::NonSentinelPadding("output values", j));
                }
                if state_hashes[j].is_some() {
                    return Err(VerificationError::OutputStateMismatch(index));
                }
                outputs[index] = CommittedOutput::stateless(claims.satoshis[j], script_hash);
            }
            _ => return Err(VerificationError::MalformedWitness(format!("target of output {}", index))),
        }
    }

    if let Some(j) = (count..STATE_OUTPUT_COUNT_MAX).find(|&j| state_hashes[j].is_some()) {
        return Err(VerificationError::NonSentinelPadding("state hashes", j));
    }

    if hash_committed_outputs(&outputs[..=count]) != fields.hash_outputs {
        return Err(VerificationError::OutputsMismatch);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(used: &[u64]) -> [Hash; 4] {
        std::array::from_fn(|slot| used.get(slot).map(|&word| Hash::from(word)).unwrap_or_else(|| type_placeholder(slot)))
    }

    #[test]
    fn test_type_table_shape() {
        check_type_table(&table(&[1, 2])).unwrap();
        assert!(matches!(check_type_table(&table(&[1, 1])), Err(VerificationError::MalformedTypeTable(_))));
        assert!(matches!(check_type_table(&table(&[])), Err(VerificationError::MalformedTypeTable(_))));
        assert_ne!(type_placeholder(0), type_placeholder(1));
        assert_ne!(type_placeholder(0), type_placeholder(256));
    }

    #[test]
    fn test_resolve_type_index() {
        let table = table(&[1, 2]);
        assert_eq!(resolve_type_index(&table, 0, -1), Ok(None));
        assert_eq!(resolve_type_index(&table, 0, 1), Ok(Some(1)));
        assert_eq!(resolve_type_index(&table, 3, 2), Err(VerificationError::InvalidTypeIndex(3, 2)));
        assert_eq!(resolve_type_index(&table, 3, 4), Err(VerificationError::InvalidTypeIndex(3, 4)));
        assert_eq!(resolve_type_index(&table, 3, -2), Err(VerificationError::InvalidTypeIndex(3, -2)));
    }

    #[test]
    fn test_output_claims_capacity() {
        let mut claims = OutputClaims::<2>::new();
        claims.push_token(OwnerAddress::Key(1.into()), 0, 5, 1).unwrap();
        claims.push_plain(3.into(), 10).unwrap();
        assert_eq!(claims.push_plain(3.into(), 10), Err(VerificationError::OutputCountOutOfRange(3, 2)));
        assert_eq!(claims.output_count, 2);
        assert_eq!(claims.targets[1], OutputTarget::Script(3.into()));
        assert_eq!(claims.targets[0], OutputTarget::Owner(OwnerAddress::Key(1.into())));
    }
}
