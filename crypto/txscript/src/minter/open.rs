use serde::{Deserialize, Serialize};
use tessera_consensus_core::{
    config::params::CollectionParams,
    hashing::sighash::SigHashFields,
    state::{NftOpenMinterState, NftState, OwnerAddress, StateRecord},
    tx::{CommittedOutput, TransactionOutpoint},
};
use tessera_core::{debug, trace};
use tessera_hashes::Hash;
use tessera_merkle::{MerkleLeaf, MerkleProof, MerkleSides, MerkleTree, update_leaf_root};
use tessera_txscript_errors::{VerificationError, VerificationResult};

use super::{ChangeOutput, MintOutputs, verify_mint_outputs};
use crate::{
    backtrace::{BacktraceInfo, GenesisAnchor, backtrace},
    context::require_all_outputs,
    state::verify_self_state,
};

/// Witness of a mint from an open minter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMintWitness {
    pub state: NftOpenMinterState,
    /// Content commitment of the identity being minted, as allocated in the tree.
    pub commitment: Hash,
    pub proof: MerkleProof,
    pub sides: MerkleSides,
    pub nft_owner: OwnerAddress,
    pub minter_satoshis: u64,
    pub nft_satoshis: u64,
    pub change: Option<ChangeOutput>,
    pub backtrace: BacktraceInfo,
}

/// A minter any party may mint from. Identities are pre-allocated in a Merkle tree and handed
/// out in order; the tree proves the identity was never minted before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftOpenMinter {
    genesis_outpoint: TransactionOutpoint,
    max_count: i64,
}

impl NftOpenMinter {
    pub fn new(genesis_outpoint: TransactionOutpoint, max_count: i64) -> Self {
        Self { genesis_outpoint, max_count }
    }

    pub fn from_params(params: &CollectionParams) -> Self {
        Self::new(params.genesis_outpoint, params.max_count)
    }

    /// State of the minter output created by the collection genesis.
    pub fn genesis_state(nft_script_hash: Hash, allocation: &MerkleTree) -> NftOpenMinterState {
        NftOpenMinterState { nft_script_hash, merkle_root: allocation.root(), next_local_id: 0 }
    }

    /// Outputs a mint must produce given the current minter state and the root after the flip.
    pub fn mint_outputs(&self, minter_script_hash: Hash, witness: &OpenMintWitness, next_root: Hash) -> MintOutputs {
        let state = &witness.state;
        let next_local_id = state.next_local_id + 1;
        let next_minter = (next_local_id < self.max_count).then(|| {
            let next_state = NftOpenMinterState { nft_script_hash: state.nft_script_hash, merkle_root: next_root, next_local_id };
            CommittedOutput::new(witness.minter_satoshis, minter_script_hash, next_state.state_hash())
        });
        let nft = NftState { owner: witness.nft_owner, local_id: state.next_local_id };
        MintOutputs {
            next_minter,
            token: CommittedOutput::new(witness.nft_satoshis, state.nft_script_hash, nft.state_hash()),
            change: witness.change,
        }
    }

    pub fn mint(&self, fields: &SigHashFields, witness: &OpenMintWitness) -> VerificationResult<()> {
        let result = self.mint_inner(fields, witness);
        match &result {
            Ok(()) => trace!("open mint of local id {} accepted", witness.state.next_local_id),
            Err(err) => debug!("open mint of local id {} rejected ({:?}): {}", witness.state.next_local_id, err.reason(), err),
        }
        result
    }

    fn mint_inner(&self, fields: &SigHashFields, witness: &OpenMintWitness) -> VerificationResult<()> {
        require_all_outputs(fields)?;
        let state = &witness.state;
        verify_self_state(fields, state)?;
        backtrace(&witness.backtrace, fields, &GenesisAnchor::Outpoint(self.genesis_outpoint))?;

        if !(0..self.max_count).contains(&state.next_local_id) {
            return Err(VerificationError::MinterExhausted);
        }

        let unminted = MerkleLeaf::unminted(witness.commitment, state.next_local_id);
        let next_root =
            update_leaf_root(unminted.hash(), unminted.into_minted().hash(), &witness.proof, &witness.sides, state.merkle_root)?;

        verify_mint_outputs(fields, &self.mint_outputs(fields.spent_script_hash, witness, next_root))
    }
}
