use tessera_consensus_core::{errors::TxCodecError, tx::TransactionOutpoint};
use tessera_hashes::Hash;
use tessera_merkle::MerkleError;
use thiserror::Error;

/// Coarse classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// A recomputed hash disagrees with a supplied or committed value.
    CommitmentMismatch,
    /// Token sums or identity sets do not balance.
    ConservationMismatch,
    /// Out-of-range index, non-sentinel padding, negative amount or undecodable witness.
    ShapeViolation,
    /// The spent output does not descend from the genesis anchor.
    ProvenanceFailure,
}

#[derive(Error, PartialEq, Eq, Debug, Clone)]
pub enum VerificationError {
    // Commitment mismatches
    #[error("state hash root mismatch: claimed {claimed} but the state hashes yield {computed}")]
    StateRootMismatch { claimed: Hash, computed: Hash },

    #[error("state hash of output {0} does not match the claimed state")]
    OutputStateMismatch(usize),

    #[error("state of the executing input does not hash to its spent data hash")]
    SelfStateMismatch,

    #[error("state of input {0} does not hash to its spent data hash")]
    InputStateMismatch(usize),

    #[error("witness {0} do not match the signed aggregate")]
    AggregateMismatch(&'static str),

    #[error("Outputs mismatch")]
    OutputsMismatch,

    #[error("guard state does not hash to the spent data hash of input {0}")]
    GuardStateMismatch(usize),

    #[error("owner authorization failed")]
    Unauthorized,

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    // Conservation mismatches
    #[error("declared amount of token type {0} does not match its inputs")]
    DeclaredAmountMismatch(usize),

    #[error("token type {type_index} does not balance: inputs {inputs}, outputs {outputs}, burned {burned}")]
    AmountMismatch { type_index: usize, inputs: i128, outputs: i128, burned: i128 },

    #[error("next nft count is invalid")]
    NftCountMismatch,

    #[error("next nft is invalid")]
    NftMismatch,

    // Shape violations
    #[error("amounts should be non-negative")]
    NegativeAmount,

    #[error("local id {0} is out of range")]
    LocalIdOutOfRange(i64),

    #[error("state output index {0} is out of range 1..={1}")]
    StateIndexOutOfRange(usize, usize),

    #[error("input count {0} is out of range 1..={1}")]
    InputCountOutOfRange(usize, usize),

    #[error("output count {0} is out of range 0..={1}")]
    OutputCountOutOfRange(usize, usize),

    #[error("input index {0} is out of range for {1} inputs")]
    InputIndexOutOfRange(usize, usize),

    #[error("{0} slot {1} holds a non-sentinel value")]
    NonSentinelPadding(&'static str, usize),

    #[error("type index {1} of slot {0} is invalid")]
    InvalidTypeIndex(usize, i8),

    #[error("input {0} does not spend the script of its declared type")]
    TypeScriptMismatch(usize),

    #[error("input {0} spends a whitelisted token script without a type index")]
    UntypedTokenInput(usize),

    #[error("type table is malformed: {0}")]
    MalformedTypeTable(String),

    #[error("the guard's own input slot must not carry a type index")]
    GuardSelfSlot,

    #[error("input {0} carries a type index but no state")]
    MissingInputState(usize),

    #[error("witness is malformed: {0}")]
    MalformedWitness(String),

    #[error("input {0} does not spend a whitelisted guard")]
    GuardNotWhitelisted(usize),

    #[error("minter has no identities left to allocate")]
    MinterExhausted,

    #[error("signature modes opting out of input or output aggregates are not supported here")]
    AggregateUnavailable,

    #[error(transparent)]
    TxCodec(#[from] TxCodecError),

    // Provenance failures
    #[error("parent transaction hashes to {computed} but the spent outpoint references {expected}")]
    ParentIdMismatch { expected: Hash, computed: Hash },

    #[error("parent output {0} does not exist or does not carry the executing script")]
    ParentOutputMismatch(u32),

    #[error("parent input {0} does not exist")]
    ParentInputOutOfRange(u32),

    #[error("grandparent transaction hashes to {computed} but the parent input references {expected}")]
    GrandparentIdMismatch { expected: Hash, computed: Hash },

    #[error("grandparent output {0} does not exist")]
    GrandparentOutputOutOfRange(u32),

    #[error("outpoint {0} neither continues the covenant nor originates from its genesis")]
    BrokenLineage(TransactionOutpoint),
}

impl VerificationError {
    pub fn reason(&self) -> RejectReason {
        use VerificationError::*;
        match self {
            StateRootMismatch { .. }
            | OutputStateMismatch(_)
            | SelfStateMismatch
            | InputStateMismatch(_)
            | AggregateMismatch(_)
            | OutputsMismatch
            | GuardStateMismatch(_)
            | Unauthorized
            | Merkle(_) => RejectReason::CommitmentMismatch,

            DeclaredAmountMismatch(_) | AmountMismatch { .. } | NftCountMismatch | NftMismatch => RejectReason::ConservationMismatch,

            NegativeAmount
            | LocalIdOutOfRange(_)
            | StateIndexOutOfRange(..)
            | InputCountOutOfRange(..)
            | OutputCountOutOfRange(..)
            | InputIndexOutOfRange(..)
            | NonSentinelPadding(..)
            | InvalidTypeIndex(..)
            | TypeScriptMismatch(_)
            | UntypedTokenInput(_)
            | MalformedTypeTable(_)
            | GuardSelfSlot
            | MissingInputState(_)
            | MalformedWitness(_)
            | GuardNotWhitelisted(_)
            | MinterExhausted
            | AggregateUnavailable
            | TxCodec(_) => RejectReason::ShapeViolation,

            ParentIdMismatch { .. }
            | ParentOutputMismatch(_)
            | ParentInputOutOfRange(_)
            | GrandparentIdMismatch { .. }
            | GrandparentOutputOutOfRange(_)
            | BrokenLineage(_) => RejectReason::ProvenanceFailure,
        }
    }
}

pub type VerificationResult<T> = std::result::Result<T, VerificationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(VerificationError::NegativeAmount.to_string(), "amounts should be non-negative");
        assert_eq!(VerificationError::NftCountMismatch.to_string(), "next nft count is invalid");
        assert_eq!(VerificationError::NftMismatch.to_string(), "next nft is invalid");
        assert_eq!(VerificationError::OutputsMismatch.to_string(), "Outputs mismatch");
    }

    #[test]
    fn test_reasons() {
        assert_eq!(VerificationError::OutputsMismatch.reason(), RejectReason::CommitmentMismatch);
        assert_eq!(VerificationError::NftMismatch.reason(), RejectReason::ConservationMismatch);
        assert_eq!(VerificationError::NonSentinelPadding("inputs", 3).reason(), RejectReason::ShapeViolation);
        assert_eq!(VerificationError::BrokenLineage(Default::default()).reason(), RejectReason::ProvenanceFailure);

        let merkle: VerificationError = MerkleError::IndexOutOfRange(1, 0).into();
        assert_eq!(merkle.reason(), RejectReason::CommitmentMismatch);
        let codec: VerificationError = TxCodecError::Malformed("eof".into()).into();
        assert_eq!(codec.reason(), RejectReason::ShapeViolation);
    }
}
