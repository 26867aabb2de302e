use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxCodecError {
    #[error("transaction bytes could not be decoded: {0}")]
    Malformed(String),

    #[error("transaction has {0} inputs while the maximum allowed is {1}")]
    TooManyInputs(usize, usize),

    #[error("transaction has {0} outputs while the maximum allowed is {1}")]
    TooManyOutputs(usize, usize),
}

pub type TxCodecResult<T> = std::result::Result<T, TxCodecError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PopulationError {
    #[error("transaction has {0} inputs but {1} utxo entries were provided")]
    EntryCountMismatch(usize, usize),

    #[error("input index {0} is out of range for a transaction with {1} inputs")]
    InputIndexOutOfRange(usize, usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("collection max count {0} must be in the range 1..={1}")]
    MaxCountOutOfRange(i64, i64),

    #[error("a collection must accept at least one guard script")]
    NoGuardScripts,

    #[error("a closed minter collection requires an issuer")]
    MissingIssuer,

    #[error("params could not be parsed: {0}")]
    Parse(String),
}

pub type ParamsResult<T> = std::result::Result<T, ParamsError>;
