//! Coin and coin-spend model.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Bytes32, CoinId, PuzzleHash};

/// An unspent value unit identified by `(parent, puzzle_hash, amount)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub parent_coin_info: Bytes32,
    pub puzzle_hash: PuzzleHash,
    pub amount: u64,
}

impl Coin {
    pub fn new(parent_coin_info: Bytes32, puzzle_hash: PuzzleHash, amount: u64) -> Self {
        Self {
            parent_coin_info,
            puzzle_hash,
            amount,
        }
    }

    /// The coin id: `sha256(parent || puzzle_hash || amount)`, where the
    /// amount uses the minimal signed big-endian encoding.
    pub fn name(&self) -> CoinId {
        let mut hasher = Sha256::new();
        hasher.update(self.parent_coin_info.as_bytes());
        hasher.update(self.puzzle_hash.as_bytes());
        hasher.update(u64_to_signed_bytes(self.amount));
        Bytes32::new(hasher.finalize().into())
    }
}

/// A coin together with the serialized puzzle reveal and solution that spend it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: Vec<u8>,
    pub solution: Vec<u8>,
}

impl CoinSpend {
    pub fn new(coin: Coin, puzzle_reveal: Vec<u8>, solution: Vec<u8>) -> Self {
        Self {
            coin,
            puzzle_reveal,
            solution,
        }
    }
}

/// Minimal two's-complement big-endian encoding of a non-negative integer.
///
/// Zero encodes as the empty string; a leading `0x00` is kept whenever the
/// high bit of the first significant byte is set.
pub fn u64_to_signed_bytes(value: u64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let be = value.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let mut out = Vec::with_capacity(9);
    if be[first] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&be[first..]);
    out
}
