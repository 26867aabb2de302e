use tessera_consensus_core::{
    config::params::CollectionParams,
    errors::{ParamsError, ParamsResult},
    state::{FtClosedMinterState, FtState, OwnerAddress, StateRecord},
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

/// Witness of a fungible mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtMintWitness {
    pub state: FtClosedMinterState,
    /// Authorization by the issuer.
    pub auth: OwnerAuth,
    pub amount: i64,
    pub token_owner: OwnerAddress,
    pub minter_satoshis: u64,
    pub token_satoshis: u64,
    pub change: Option<ChangeOutput>,
    pub backtrace: BacktraceInfo,
}

/// Issuer-only minter of a fungible token. Each mint issues an amount to one owner, until the
/// supply cap is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtClosedMinter {
    genesis_outpoint: TransactionOutpoint,
    issuer: OwnerAddress,
}

impl FtClosedMinter {
    pub fn new(genesis_outpoint: TransactionOutpoint, issuer: OwnerAddress) -> Self {
        Self { genesis_outpoint, issuer }
    }

    pub fn from_params(params: &CollectionParams) -> ParamsResult<Self> {
        let issuer = params.issuer.ok_or(ParamsError::MissingIssuer)?;
        Ok(Self::new(params.genesis_outpoint, issuer))
    }

    pub fn genesis_state(token_script_hash: Hash, max_supply: i64) -> FtClosedMinterState {
        FtClosedMinterState { token_script_hash, max_supply, minted: 0 }
    }

    /// The minter is recreated while supply remains.
    pub fn mint_outputs(&self, minter_script_hash: Hash, witness: &FtMintWitness) -> VerificationResult<MintOutputs> {
        let state = &witness.state;
        let minted = state.minted.checked_add(witness.amount).ok_or(VerificationError::MinterExhausted)?;
        let next_minter = (minted < state.max_supply).then(|| {
            let next_state = FtClosedMinterState { minted, ..state.clone() };
            CommittedOutput::new(witness.minter_satoshis, minter_script_hash, next_state.state_hash())
        });
        let token = FtState { owner: witness.token_owner, amount: witness.amount };
        Ok(MintOutputs {
            next_minter,
            token: CommittedOutput::new(witness.token_satoshis, state.token_script_hash, token.state_hash()),
            change: witness.change,
        })
    }

    pub fn mint<const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        witness: &FtMintWitness,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let result = self.mint_inner(ctx, witness, verifier);
        match &result {
            Ok(()) => trace!("fungible mint of {} accepted", witness.amount),
            Err(err) => debug!("fungible mint of {} rejected ({:?}): {}", witness.amount, err.reason(), err),
        }
        result
    }

    fn mint_inner<const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        witness: &FtMintWitness,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let fields = ctx.fields();
        require_all_outputs(fields)?;
        let state = &witness.state;
        verify_self_state(fields, state)?;
        authorize(&self.issuer, &witness.auth, ctx, verifier)?;
        backtrace(&witness.backtrace, fields, &GenesisAnchor::Outpoint(self.genesis_outpoint))?;

        if witness.amount <= 0 {
            return Err(VerificationError::NegativeAmount);
        }
        if state.minted >= state.max_supply || witness.amount > state.max_supply - state.minted {
            return Err(VerificationError::MinterExhausted);
        }
        verify_mint_outputs(fields, &self.mint_outputs(fields.spent_script_hash, witness)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::InputsWitness,
        state::{state_hash_root, state_hashes_of},
        testutils::{MockVerifier, mock_sign},
    };
    use tessera_consensus_core::{
        config::params::CollectionParamsBuilder,
        testutils::{create_transaction::*, scripts::covenant_script},
        tx::{Transaction, TransactionOutput},
    };
    use tessera_hashes::ZERO_HASH;

    fn with_root(mut outputs: Vec<TransactionOutput>) -> Vec<TransactionOutput> {
        outputs.insert(0, TransactionOutput::state_root(ZERO_HASH));
        outputs[0] = TransactionOutput::state_root(state_hash_root(&state_hashes_of(&outputs)));
        outputs
    }

    fn minter_output(state: &FtClosedMinterState) -> TransactionOutput {
        TransactionOutput::new(10, covenant_script("ft minter"), state.state_hash())
    }

    struct Issuance {
        minter: FtClosedMinter,
        minter_tx: Transaction,
        parent_tx: Transaction,
        state: FtClosedMinterState,
    }

    impl Issuance {
        fn deploy(max_supply: i64) -> Self {
            let seed = create_funding_transaction(8, vec![create_fee_output(1000)]);
            let params = CollectionParamsBuilder::new("gold", seed.outpoint(0))
                .closed(OwnerAddress::from_pubkey(b"issuer"))
                .accept_guard(covenant_script("ft guard").script_hash())
                .build()
                .unwrap();
            let minter = FtClosedMinter::from_params(&params).unwrap();
            let state = FtClosedMinter::genesis_state(covenant_script("gold").script_hash(), max_supply);
            let genesis = create_transaction(&[seed.outpoint(0)], with_root(vec![minter_output(&state)]));
            Self { minter, minter_tx: genesis, parent_tx: seed, state }
        }

        /// Mints `amount` signed by `signer`. The outputs are built for `declared`, which
        /// defaults to `amount`.
        fn mint(&mut self, signer: &[u8], amount: i64, declared: Option<i64>) -> VerificationResult<()> {
            let state = self.state.clone();
            let declared = declared.unwrap_or(amount);
            let next_state = FtClosedMinterState { minted: state.minted + declared, ..state.clone() };
            let owner = OwnerAddress::from_pubkey(b"grace");
            let mut outputs = vec![];
            if next_state.minted < state.max_supply {
                outputs.push(minter_output(&next_state));
            }
            let token = FtState { owner, amount: declared };
            outputs.push(TransactionOutput::new(1, covenant_script("gold"), token.state_hash()));

            let (tx, entries) = spend_outputs(&[(&self.minter_tx, 1)], with_root(outputs));
            let populated = populate(&tx, entries);
            let fields = sighash_fields(&populated, 0);
            let ctx = SpendContext::<4>::new(&fields, InputsWitness::from_populated(&populated)?)?;
            let witness = FtMintWitness {
                state,
                auth: OwnerAuth::Signature { pubkey: signer.to_vec(), signature: mock_sign(signer, &fields.signature_hash()) },
                amount,
                token_owner: owner,
                minter_satoshis: 10,
                token_satoshis: 1,
                change: None,
                backtrace: BacktraceInfo::new(&self.minter_tx, 0, &self.parent_tx),
            };
            self.minter.mint(&ctx, &witness, &MockVerifier)?;

            self.parent_tx = std::mem::replace(&mut self.minter_tx, tx);
            self.state = next_state;
            Ok(())
        }
    }

    #[test]
    fn test_issue_up_to_supply() {
        let mut gold = Issuance::deploy(1000);
        gold.mint(b"issuer", 400, None).unwrap();
        gold.mint(b"issuer", 500, None).unwrap();
        assert_eq!(gold.mint(b"issuer", 101, None), Err(VerificationError::MinterExhausted));
        gold.mint(b"issuer", 100, None).unwrap();
        // The last mint retires the minter
        assert_eq!(gold.state.minted, 1000);
        assert_eq!(gold.minter_tx.outputs.len(), 2);
    }

    #[test]
    fn test_only_issuer_mints() {
        let mut gold = Issuance::deploy(1000);
        assert_eq!(gold.mint(b"mallory", 10, None), Err(VerificationError::Unauthorized));
        gold.mint(b"issuer", 10, None).unwrap();
    }

    #[test]
    fn test_amounts_checked() {
        let mut gold = Issuance::deploy(1000);
        assert_eq!(gold.mint(b"issuer", 0, None), Err(VerificationError::NegativeAmount));
        assert_eq!(gold.mint(b"issuer", -5, None), Err(VerificationError::NegativeAmount));
        assert_eq!(gold.mint(b"issuer", i64::MAX, None), Err(VerificationError::MinterExhausted));

        // Outputs carrying more than the witnessed amount
        let err = gold.mint(b"issuer", 10, Some(20)).unwrap_err();
        assert_eq!(err.to_string(), "Outputs mismatch");
    }
}
