use tessera_consensus_core::{
    config::params::CollectionParams,
    errors::{ParamsError, ParamsResult},
    state::{NftClosedMinterState, NftState, OwnerAddress, StateRecord},
    tx::{CommittedOutput, TransactionOutpoint},
};
use tessera_core::{debug, trace};
use tessera_hashes::Hash;
use tessera_txscript_errors::{VerificationError, VerificationResult};

use super::{ChangeOutput, MintOutputs, verify_mint_outputs};
use crate::{
    backtrace::{BacktraceInfo, GenesisAnchor, backtrace},
    context::{SpendContext, require_all_outputs},
    state::verify_self_state,
    token::{OwnerAuth, SigVerifier, authorize},
};

/// Witness of a mint from a closed minter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedMintWitness {
    pub state: NftClosedMinterState,
    /// Authorization by the collection issuer.
    pub auth: OwnerAuth,
    pub nft_owner: OwnerAddress,
    pub minter_satoshis: u64,
    pub nft_satoshis: u64,
    pub change: Option<ChangeOutput>,
    pub backtrace: BacktraceInfo,
}

/// A minter only the issuer may mint from. The quota is carried in the minter state and
/// identities are handed out by its counter alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftClosedMinter {
    genesis_outpoint: TransactionOutpoint,
    issuer: OwnerAddress,
}

impl NftClosedMinter {
    pub fn new(genesis_outpoint: TransactionOutpoint, issuer: OwnerAddress) -> Self {
        Self { genesis_outpoint, issuer }
    }

    pub fn from_params(params: &CollectionParams) -> ParamsResult<Self> {
        let issuer = params.issuer.ok_or(ParamsError::MissingIssuer)?;
        Ok(Self::new(params.genesis_outpoint, issuer))
    }

    pub fn genesis_state(nft_script_hash: Hash, max_count: i64) -> NftClosedMinterState {
        NftClosedMinterState { nft_script_hash, max_count, next_local_id: 0 }
    }

    pub fn mint_outputs(&self, minter_script_hash: Hash, witness: &ClosedMintWitness) -> MintOutputs {
        let state = &witness.state;
        let next_local_id = state.next_local_id + 1;
        let next_minter = (next_local_id < state.max_count).then(|| {
            let next_state = NftClosedMinterState { next_local_id, ..state.clone() };
            CommittedOutput::new(witness.minter_satoshis, minter_script_hash, next_state.state_hash())
        });
        let nft = NftState { owner: witness.nft_owner, local_id: state.next_local_id };
        MintOutputs {
            next_minter,
            token: CommittedOutput::new(witness.nft_satoshis, state.nft_script_hash, nft.state_hash()),
            change: witness.change,
        }
    }

    pub fn mint<const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        witness: &ClosedMintWitness,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let result = self.mint_inner(ctx, witness, verifier);
        match &result {
            Ok(()) => trace!("closed mint of local id {} accepted", witness.state.next_local_id),
            Err(err) => debug!("closed mint of local id {} rejected ({:?}): {}", witness.state.next_local_id, err.reason(), err),
        }
        result
    }

    fn mint_inner<const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        witness: &ClosedMintWitness,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let fields = ctx.fields();
        require_all_outputs(fields)?;
        let state = &witness.state;
        verify_self_state(fields, state)?;
        authorize(&self.issuer, &witness.auth, ctx, verifier)?;
        backtrace(&witness.backtrace, fields, &GenesisAnchor::Outpoint(self.genesis_outpoint))?;

        if !(0..state.max_count).contains(&state.next_local_id) {
            return Err(VerificationError::MinterExhausted);
        }
        verify_mint_outputs(fields, &self.mint_outputs(fields.spent_script_hash, witness))
    }
}
