//!
//! Covenant verifiers of the token protocol.
//!
//! Every verifier is a pure function of its deploy-time parameters, the signing-digest fields
//! of the executing input and a witness supplied by the spender. It either accepts or returns a
//! [`VerificationError`] carrying the reason of the rejection.
//!

pub mod backtrace;
pub mod context;
pub mod guard;
pub mod minter;
pub mod state;
pub mod token;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use backtrace::{BacktraceInfo, GenesisAnchor, backtrace};
pub use context::{InputsWitness, SpendContext};
pub use state::{StateHashes, check_output_state, state_hash_root};
pub use tessera_txscript_errors::{RejectReason, VerificationError, VerificationResult};
pub use token::{FungibleToken, NonFungibleToken, OwnerAuth, SigVerifier, TokenUnlock};
