use stakelock_crypto::MerkleError;
use stakelock_script::ScriptError;
use stakelock_types::{Bytes32, CoinId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unauthorized unlock: inner puzzle {actual} is not the committed recipient {expected}")]
    UnauthorizedUnlock { expected: Bytes32, actual: Bytes32 },

    #[error("script evaluation failed: {0}")]
    ScriptEvaluation(#[from] ScriptError),

    #[error("coin {coin} has puzzle hash {actual}, lock puzzle hashes to {expected}")]
    PuzzleHashMismatch {
        coin: CoinId,
        expected: Bytes32,
        actual: Bytes32,
    },

    #[error("commitment tree: {0}")]
    Commitment(#[from] MerkleError),
}
