//!
//! Token covenants.
//!
//! A token output may only be spent by its owner, together with a whitelisted guard that
//! accounts for it, and only if it descends from the collection minter.
//!

use std::marker::PhantomData;
use tessera_consensus_core::{
    config::params::CollectionParams,
    state::{FtState, NftState, OwnerAddress, StateRecord},
};
use tessera_core::{debug, trace};
use tessera_hashes::{Hash, Hasher, OwnerKeyHash};
use tessera_txscript_errors::{VerificationError, VerificationResult};

use crate::{
    backtrace::{BacktraceInfo, GenesisAnchor, backtrace},
    context::SpendContext,
    guard::GuardState,
    state::verify_self_state,
};

/// Signature verification is provided by the embedding environment.
pub trait SigVerifier {
    fn verify(&self, pubkey: &[u8], signature: &[u8], digest: &Hash) -> bool;
}

/// Proof that the owner of a spent output agrees to the spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerAuth {
    /// For key owners: a signature over the signing digest of the executing input.
    Signature { pubkey: Vec<u8>, signature: Vec<u8> },
    /// For contract owners: the co-spent input locked by the owning contract.
    Contract { input_index: usize },
}

pub fn authorize<const INPUTS: usize>(
    owner: &OwnerAddress,
    auth: &OwnerAuth,
    ctx: &SpendContext<INPUTS>,
    verifier: &impl SigVerifier,
) -> VerificationResult<()> {
    let authorized = match (owner, auth) {
        (OwnerAddress::Key(key_hash), OwnerAuth::Signature { pubkey, signature }) => {
            OwnerKeyHash::hash(pubkey) == *key_hash && verifier.verify(pubkey, signature, &ctx.fields().signature_hash())
        }
        (OwnerAddress::Contract(script_hash), OwnerAuth::Contract { input_index }) => {
            *input_index != ctx.input_index() && ctx.spent_script_hash(*input_index)? == *script_hash
        }
        _ => false,
    };
    if authorized { Ok(()) } else { Err(VerificationError::Unauthorized) }
}

/// Records held by token outputs.
pub trait TokenState: StateRecord {
    fn owner(&self) -> &OwnerAddress;

    fn check_value(&self) -> VerificationResult<()>;
}

impl TokenState for FtState {
    fn owner(&self) -> &OwnerAddress {
        &self.owner
    }

    fn check_value(&self) -> VerificationResult<()> {
        if self.amount < 0 { Err(VerificationError::NegativeAmount) } else { Ok(()) }
    }
}

impl TokenState for NftState {
    fn owner(&self) -> &OwnerAddress {
        &self.owner
    }

    fn check_value(&self) -> VerificationResult<()> {
        if self.local_id < 0 { Err(VerificationError::LocalIdOutOfRange(self.local_id)) } else { Ok(()) }
    }
}

/// Witness of a token spend.
#[derive(Debug, Clone)]
pub struct TokenUnlock<S, G> {
    pub state: S,
    pub auth: OwnerAuth,
    pub guard_input_index: usize,
    pub guard_state: G,
    pub backtrace: BacktraceInfo,
}

/// A token covenant, parameterized at deploy time by the script hash of the minter it descends
/// from and the guard variants it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCovenant<S> {
    minter_script_hash: Hash,
    guard_script_hashes: Vec<Hash>,
    _state: PhantomData<S>,
}

pub type FungibleToken = TokenCovenant<FtState>;
pub type NonFungibleToken = TokenCovenant<NftState>;

impl<S: TokenState> TokenCovenant<S> {
    pub fn new(minter_script_hash: Hash, guard_script_hashes: Vec<Hash>) -> Self {
        Self { minter_script_hash, guard_script_hashes, _state: PhantomData }
    }

    pub fn from_params(params: &CollectionParams, minter_script_hash: Hash) -> Self {
        Self::new(minter_script_hash, params.guard_script_hashes.clone())
    }

    pub fn minter_script_hash(&self) -> Hash {
        self.minter_script_hash
    }

    pub fn unlock<G: GuardState, const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        unlock: &TokenUnlock<S, G>,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let result = self.unlock_inner(ctx, unlock, verifier);
        match &result {
            Ok(()) => trace!("token spend at input {} accepted", ctx.input_index()),
            Err(err) => debug!("token spend at input {} rejected ({:?}): {}", ctx.input_index(), err.reason(), err),
        }
        result
    }

    fn unlock_inner<G: GuardState, const INPUTS: usize>(
        &self,
        ctx: &SpendContext<INPUTS>,
        unlock: &TokenUnlock<S, G>,
        verifier: &impl SigVerifier,
    ) -> VerificationResult<()> {
        let fields = ctx.fields();
        verify_self_state(fields, &unlock.state)?;
        unlock.state.check_value()?;
        authorize(unlock.state.owner(), &unlock.auth, ctx, verifier)?;

        let guard_index = unlock.guard_input_index;
        if !self.guard_script_hashes.contains(&ctx.spent_script_hash(guard_index)?) {
            return Err(VerificationError::GuardNotWhitelisted(guard_index));
        }
        if unlock.guard_state.state_hash() != ctx.spent_data_hash(guard_index)? {
            return Err(VerificationError::GuardStateMismatch(guard_index));
        }
        if unlock.guard_state.type_script_hash(ctx.input_index()) != Some(fields.spent_script_hash) {
            return Err(VerificationError::TypeScriptMismatch(ctx.input_index()));
        }

        backtrace(&unlock.backtrace, fields, &GenesisAnchor::Script(self.minter_script_hash))
    }
}
