pub mod protocol {
    //!
    //! Protocol maxima. Every fixed-capacity witness array is sized from these at compile time.
    //!

    /// Maximum number of inputs of any transaction the covenants accept.
    pub const TX_INPUT_COUNT_MAX: usize = 12;

    /// Maximum number of outputs of any transaction, including the state root output.
    pub const TX_OUTPUT_COUNT_MAX: usize = 12;

    /// Number of state-bearing output slots summarized by the state hash root (`K`).
    /// Output 0 is reserved for the root itself.
    pub const STATE_OUTPUT_COUNT_MAX: usize = TX_OUTPUT_COUNT_MAX - 1;

    /// Number of token types a single guard can reconcile.
    pub const GUARD_TOKEN_TYPE_MAX: usize = 4;

    /// Input capacity of the small guard variant.
    pub const GUARD_SMALL_INPUT_COUNT: usize = 6;

    /// State output capacity of the small guard variant.
    pub const GUARD_SMALL_OUTPUT_COUNT: usize = 5;

    /// Input capacity of the large guard variant.
    pub const GUARD_LARGE_INPUT_COUNT: usize = TX_INPUT_COUNT_MAX;

    /// State output capacity of the large guard variant.
    pub const GUARD_LARGE_OUTPUT_COUNT: usize = STATE_OUTPUT_COUNT_MAX;

    /// Sentinel type index of an input or output slot which is not a token of the guard.
    pub const SENTINEL_TYPE_INDEX: i8 = -1;

    const _: () = assert!(GUARD_SMALL_INPUT_COUNT <= TX_INPUT_COUNT_MAX && GUARD_SMALL_OUTPUT_COUNT <= STATE_OUTPUT_COUNT_MAX);
    const _: () = assert!(GUARD_TOKEN_TYPE_MAX < i8::MAX as usize);
}

pub mod merkle {
    //!
    //! Shape of the allocation tree of open minters.
    //!

    pub use tessera_merkle::{MERKLE_PROOF_DEPTH, MERKLE_TREE_HEIGHT, MERKLE_TREE_MAX_LEAVES};
}

pub use merkle::*;
pub use protocol::*;
