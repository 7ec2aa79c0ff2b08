//! Fundamental types for time-locked stake commitments.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! 32-byte hashes, coins and coin spends, timestamps, the exact-decimal stake
//! coefficient and the static stake tier table.

pub mod coefficient;
pub mod coin;
pub mod error;
pub mod hash;
pub mod tier;
pub mod time;

pub use coefficient::Coefficient;
pub use coin::{Coin, CoinSpend};
pub use error::StakeError;
pub use hash::{Bytes32, CoinId, PuzzleHash};
pub use tier::{stake_tier, time_lock_for, StakeTier, DEFAULT_STAKE_TYPE, STAKE_TIERS};
pub use time::Timestamp;

/// Block height as tracked by the ledger. Zero means "not yet" for spend markers.
pub type BlockHeight = u32;
