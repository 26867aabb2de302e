//!
//! State hash root of a transaction and the checks built on it.
//!
//! Output 0 of every state-bearing transaction carries the state hash root: a single hash over
//! the state hashes of output slots `1..=K`. A covenant holding the root (through the outputs
//! hash it rebuilds, or through an ancestor's bytes) can then learn the state hash of any other
//! output by having the full array supplied and rehashing it.
//!

use tessera_consensus_core::{
    config::constants::STATE_OUTPUT_COUNT_MAX,
    hashing::sighash::SigHashFields,
    state::StateRecord,
    tx::{NO_STATE_HASH, TransactionOutput},
};
use tessera_core::debug;
use tessera_hashes::{Hash, Hasher, HasherBase, StateHashRoot, StateSlotHash};
use tessera_txscript_errors::{VerificationError, VerificationResult};

/// State hashes of output slots `1..=K`, in order. `None` marks a slot without state.
pub type StateHashes = [Option<Hash>; STATE_OUTPUT_COUNT_MAX];

pub const EMPTY_STATE_HASHES: StateHashes = [None; STATE_OUTPUT_COUNT_MAX];

/// Each slot is hashed on its own (an empty slot hashes the empty string), the slot hashes are
/// concatenated and hashed once more.
pub fn state_hash_root(hashes: &StateHashes) -> Hash {
    let mut hasher = StateHashRoot::new();
    for slot in hashes.iter() {
        match slot {
            Some(hash) => hasher.update(StateSlotHash::hash(hash)),
            None => hasher.update(StateSlotHash::hash(b"")),
        };
    }
    hasher.finalize()
}

/// Confirms that output `index` carries `claimed_hash`, given the root committed by output 0.
pub fn check_output_state(root: Hash, hashes: &StateHashes, claimed_hash: Hash, index: usize) -> VerificationResult<()> {
    if index == 0 || index > STATE_OUTPUT_COUNT_MAX {
        return Err(VerificationError::StateIndexOutOfRange(index, STATE_OUTPUT_COUNT_MAX));
    }
    let computed = state_hash_root(hashes);
    if computed != root {
        return Err(VerificationError::StateRootMismatch { claimed: root, computed });
    }
    if hashes[index - 1] != Some(claimed_hash) {
        return Err(VerificationError::OutputStateMismatch(index));
    }
    Ok(())
}

/// The executing input's own state must hash to the data hash of the output it spends.
pub fn verify_self_state<S: StateRecord>(fields: &SigHashFields, state: &S) -> VerificationResult<()> {
    if state.state_hash() != fields.spent_data_hash {
        debug!("self state mismatch on input {} spending {}", fields.input_index, fields.outpoint);
        return Err(VerificationError::SelfStateMismatch);
    }
    Ok(())
}

/// Data field of the output at state slot `index` (1-based).
pub fn slot_data(hashes: &StateHashes, index: usize) -> Hash {
    index.checked_sub(1).and_then(|i| hashes.get(i).copied().flatten()).unwrap_or(NO_STATE_HASH)
}

/// Collects the state hashes of a transaction's outputs, skipping the state root output.
/// Used by spenders assembling witnesses.
pub fn state_hashes_of(outputs: &[TransactionOutput]) -> StateHashes {
    let mut hashes = EMPTY_STATE_HASHES;
    for (slot, output) in hashes.iter_mut().zip(outputs.iter().skip(1)) {
        *slot = output.has_state().then_some(output.data);
    }
    hashes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use tessera_consensus_core::{
        state::{FtState, OwnerAddress},
        testutils::{create_transaction::*, scripts::covenant_script},
    };

    fn sample_hashes() -> StateHashes {
        let mut hashes = EMPTY_STATE_HASHES;
        hashes[0] = Some(11.into());
        hashes[1] = Some(12.into());
        hashes[4] = Some(15.into());
        hashes
    }

    #[test]
    fn test_root_is_deterministic_and_position_sensitive() {
        let hashes = sample_hashes();
        assert_eq!(state_hash_root(&hashes), state_hash_root(&sample_hashes()));

        let mut swapped = hashes;
        swapped.swap(0, 1);
        assert_ne!(state_hash_root(&hashes), state_hash_root(&swapped));

        let mut moved = hashes;
        moved.swap(4, 5);
        assert_ne!(state_hash_root(&hashes), state_hash_root(&moved));

        assert_ne!(state_hash_root(&EMPTY_STATE_HASHES), state_hash_root(&hashes));
    }

    #[test]
    fn test_root_matches_layout() {
        let hashes = sample_hashes();
        let mut concatenated = vec![];
        for slot in hashes.iter() {
            let slot_hash = match slot {
                Some(hash) => StateSlotHash::hash(hash),
                None => StateSlotHash::hash(b""),
            };
            concatenated.extend_from_slice(&slot_hash.as_bytes());
        }
        assert_eq!(state_hash_root(&hashes), StateHashRoot::hash(concatenated));
    }

    #[test]
    fn test_check_output_state() {
        let hashes = sample_hashes();
        let root = state_hash_root(&hashes);
        check_output_state(root, &hashes, 11.into(), 1).unwrap();
        check_output_state(root, &hashes, 15.into(), 5).unwrap();

        assert_eq!(check_output_state(root, &hashes, 12.into(), 1), Err(VerificationError::OutputStateMismatch(1)));
        assert_eq!(check_output_state(root, &hashes, 11.into(), 3), Err(VerificationError::OutputStateMismatch(3)));
        assert_eq!(
            check_output_state(root, &hashes, 11.into(), 0),
            Err(VerificationError::StateIndexOutOfRange(0, STATE_OUTPUT_COUNT_MAX))
        );
        assert_eq!(
            check_output_state(root, &hashes, 11.into(), STATE_OUTPUT_COUNT_MAX + 1),
            Err(VerificationError::StateIndexOutOfRange(STATE_OUTPUT_COUNT_MAX + 1, STATE_OUTPUT_COUNT_MAX))
        );

        let mut lying = hashes;
        lying[1] = Some(11.into());
        assert!(matches!(check_output_state(root, &lying, 11.into(), 2), Err(VerificationError::StateRootMismatch { .. })));
    }

    #[test]
    fn test_random_slot_tampering() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let mut hashes = EMPTY_STATE_HASHES;
            for slot in hashes.iter_mut() {
                if rng.gen_bool(0.5) {
                    *slot = Some(Hash::from_u64_word(rng.gen_range(0..u64::MAX)));
                }
            }
            let root = state_hash_root(&hashes);
            let index = rng.gen_range(0..STATE_OUTPUT_COUNT_MAX);
            let mut tampered = hashes;
            tampered[index] = match hashes[index] {
                Some(_) => None,
                None => Some(Hash::from_u64_word(rng.gen_range(0..u64::MAX))),
            };
            assert_ne!(root, state_hash_root(&tampered));
        }
    }

    #[test]
    fn test_self_state() {
        let owner = OwnerAddress::from_pubkey(b"alice");
        let state = FtState { owner, amount: 10 };
        let funding = create_funding_transaction(1, vec![TransactionOutput::new(10, covenant_script("token"), state.state_hash())]);
        let (tx, entries) = spend_outputs(&[(&funding, 0)], vec![create_fee_output(5)]);
        let populated = populate(&tx, entries);
        let fields = sighash_fields(&populated, 0);
        verify_self_state(&fields, &state).unwrap();
        assert_eq!(verify_self_state(&fields, &FtState { owner, amount: 11 }), Err(VerificationError::SelfStateMismatch));
    }

    #[test]
    fn test_state_hashes_of_outputs() {
        let outputs = vec![
            TransactionOutput::state_root(1.into()),
            TransactionOutput::new(1, covenant_script("a"), 21.into()),
            create_fee_output(3),
            TransactionOutput::new(1, covenant_script("b"), 23.into()),
        ];
        let hashes = state_hashes_of(&outputs);
        assert_eq!(hashes[..4], [Some(Hash::from(21u64)), None, Some(Hash::from(23u64)), None]);
        assert_eq!(slot_data(&hashes, 1), Hash::from(21u64));
        assert_eq!(slot_data(&hashes, 2), NO_STATE_HASH);
        assert_eq!(slot_data(&hashes, 0), NO_STATE_HASH);
        assert_eq!(slot_data(&hashes, STATE_OUTPUT_COUNT_MAX + 1), NO_STATE_HASH);
    }
}
