//! Binary composite keys for the stake index databases.
//!
//! Every index key is `<sort field, big-endian> ++ coin_name(32)` mapping to
//! an empty value. Big-endian fields sort numerically under LMDB's
//! lexicographic order, so range and prefix scans come out ordered by the
//! field and then by coin name.

use std::ops::Bound;

use stakelock_types::{BlockHeight, CoinId, PuzzleHash, Timestamp};

pub(crate) const COIN_LEN: usize = 32;

/// `height_be(4) ++ coin(32)` for `stake_confirmed` and `stake_spent`.
pub(crate) fn height_key(height: BlockHeight, coin: &CoinId) -> [u8; 4 + COIN_LEN] {
    let mut key = [0u8; 4 + COIN_LEN];
    key[..4].copy_from_slice(&height.to_be_bytes());
    key[4..].copy_from_slice(coin.as_bytes());
    key
}

/// `stake_type_be(2) ++ coin(32)` for `stake_type`.
pub(crate) fn stake_type_key(stake_type: u16, coin: &CoinId) -> [u8; 2 + COIN_LEN] {
    let mut key = [0u8; 2 + COIN_LEN];
    key[..2].copy_from_slice(&stake_type.to_be_bytes());
    key[2..].copy_from_slice(coin.as_bytes());
    key
}

/// `puzzle_hash(32) ++ coin(32)` for `stake_puzzle_hash`.
pub(crate) fn puzzle_hash_key(puzzle_hash: &PuzzleHash, coin: &CoinId) -> [u8; 64] {
    let mut key = [0u8; 64];
    key[..32].copy_from_slice(puzzle_hash.as_bytes());
    key[32..].copy_from_slice(coin.as_bytes());
    key
}

/// `expiration_be(8) ++ coin(32)` for `stake_expiration`.
pub(crate) fn expiration_key(expiration: Timestamp, coin: &CoinId) -> [u8; 8 + COIN_LEN] {
    let mut key = [0u8; 8 + COIN_LEN];
    key[..8].copy_from_slice(&expiration.as_secs().to_be_bytes());
    key[8..].copy_from_slice(coin.as_bytes());
    key
}

/// Trailing coin name of an index key.
pub(crate) fn coin_suffix(key: &[u8]) -> Option<CoinId> {
    let start = key.len().checked_sub(COIN_LEN)?;
    CoinId::from_slice(&key[start..])
}

/// Leading big-endian `u64` of an expiration key.
pub(crate) fn expiration_prefix(key: &[u8]) -> Option<Timestamp> {
    let head: [u8; 8] = key.get(..8)?.try_into().ok()?;
    Some(Timestamp::new(u64::from_be_bytes(head)))
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// `None` when no such string exists (the prefix is all `0xff`).
pub(crate) fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xff {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Range bounds covering every key that starts with `prefix`.
pub(crate) fn prefix_bounds(prefix: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let upper = match increment_prefix(prefix) {
        Some(upper) => Bound::Excluded(upper),
        None => Bound::Unbounded,
    };
    (Bound::Included(prefix.to_vec()), upper)
}
