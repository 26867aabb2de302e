//!
//! Minter covenants.
//!
//! A minter output carries the issuance state of a token. Each mint spends it, hands out one
//! token output (an nft identity or a fungible amount) and recreates the minter with the
//! advanced state, until the supply is exhausted. The minter rebuilds the complete output list of the mint and compares it with
//! the signed outputs hash, so nothing besides the listed outputs can be produced.
//!

pub mod closed;
pub mod fungible;
pub mod open;

use serde::{Deserialize, Serialize};
use tessera_consensus_core::{
    hashing::sighash::{SigHashFields, hash_committed_outputs},
    tx::CommittedOutput,
};
use tessera_hashes::Hash;
use tessera_txscript_errors::{VerificationError, VerificationResult};

use crate::state::{EMPTY_STATE_HASHES, StateHashes, state_hash_root};

pub use closed::{ClosedMintWitness, NftClosedMinter};
pub use fungible::{FtClosedMinter, FtMintWitness};
pub use open::{NftOpenMinter, OpenMintWitness};

/// A plain output returning leftover funds of the minting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOutput {
    pub script_hash: Hash,
    pub value: u64,
}

/// Outputs of a mint, excluding the state root output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutputs {
    /// Absent once the last identity is handed out.
    pub next_minter: Option<CommittedOutput>,
    /// The minted token output.
    pub token: CommittedOutput,
    pub change: Option<ChangeOutput>,
}

impl MintOutputs {
    pub fn state_hashes(&self) -> StateHashes {
        let mut hashes = EMPTY_STATE_HASHES;
        for (slot, output) in hashes.iter_mut().zip(self.next_minter.iter().chain(std::iter::once(&self.token))) {
            *slot = Some(output.data);
        }
        hashes
    }
}

/// Builds the full output list of a mint, state root first. Used on-chain by the minters and
/// off-chain by the minting party.
pub fn build_mint_outputs(mint: &MintOutputs) -> Vec<CommittedOutput> {
    let mut outputs = Vec::with_capacity(4);
    outputs.push(CommittedOutput::state_root(state_hash_root(&mint.state_hashes())));
    outputs.extend(mint.next_minter);
    outputs.push(mint.token);
    outputs.extend(mint.change.map(|change| CommittedOutput::stateless(change.value, change.script_hash)));
    outputs
}

pub(crate) fn verify_mint_outputs(fields: &SigHashFields, mint: &MintOutputs) -> VerificationResult<()> {
    if hash_committed_outputs(&build_mint_outputs(mint)) != fields.hash_outputs {
        return Err(VerificationError::OutputsMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_consensus_core::{
        hashing::sighash::hash_outputs,
        testutils::scripts::{covenant_script, op_true_script},
        tx::{NO_STATE_HASH, TransactionOutput},
    };

    #[test]
    fn test_build_mint_outputs() {
        let minter = TransactionOutput::new(10, covenant_script("minter"), 1.into());
        let nft = TransactionOutput::new(1, covenant_script("nft"), 2.into());
        let change = TransactionOutput::stateless(500, op_true_script());

        let mint = MintOutputs {
            next_minter: Some(CommittedOutput::from(&minter)),
            token: CommittedOutput::from(&nft),
            change: Some(ChangeOutput { script_hash: op_true_script().script_hash(), value: 500 }),
        };
        let hashes = mint.state_hashes();
        assert_eq!(hashes[..3], [Some(Hash::from(1u64)), Some(Hash::from(2u64)), None]);

        let outputs = build_mint_outputs(&mint);
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[3].data, NO_STATE_HASH);
        let tx_outputs = [TransactionOutput::state_root(state_hash_root(&hashes)), minter, nft.clone(), change];
        assert_eq!(hash_committed_outputs(&outputs), hash_outputs(&tx_outputs));

        // The last mint has no next minter and the nft moves up one slot
        let last = MintOutputs { next_minter: None, token: CommittedOutput::from(&nft), change: None };
        assert_eq!(last.state_hashes()[0], Some(Hash::from(2u64)));
        assert_eq!(build_mint_outputs(&last).len(), 2);
    }
}
