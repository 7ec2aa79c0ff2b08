//! Static stake tier table.
//!
//! Each tier pairs a lock duration with a reward coefficient. The table is
//! consensus data: a stake records its tier index on chain, and every node
//! must resolve that index to the same duration. Historical accounting never
//! reads coefficients from here after confirmation (see `StakeRecord`).

use crate::Coefficient;

const DAY_SECS: u64 = 86_400;

/// Tier used when a caller does not choose one.
pub const DEFAULT_STAKE_TYPE: u16 = 0;

/// One entry of the tier table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeTier {
    /// Lock duration in seconds.
    pub time_lock: u64,
    /// Reward multiplier applied to the staked amount.
    pub coefficient: Coefficient,
}

impl StakeTier {
    const fn new(days: u64, coefficient_scaled: u64) -> Self {
        Self {
            time_lock: days * DAY_SECS,
            coefficient: Coefficient::from_scaled(coefficient_scaled),
        }
    }

    /// Lock duration in whole days.
    pub fn days(&self) -> u64 {
        self.time_lock / DAY_SECS
    }
}

/// The twelve predefined tiers, from one week at ×1 to thirty years at ×2.
pub static STAKE_TIERS: [StakeTier; 12] = [
    StakeTier::new(7, 10_000),
    StakeTier::new(30, 10_500),
    StakeTier::new(90, 11_000),
    StakeTier::new(180, 12_000),
    StakeTier::new(365, 13_000),
    StakeTier::new(730, 14_000),
    StakeTier::new(1095, 15_000),
    StakeTier::new(1825, 16_000),
    StakeTier::new(3650, 17_000),
    StakeTier::new(5475, 18_000),
    StakeTier::new(7300, 19_000),
    StakeTier::new(10950, 20_000),
];

/// Look up a tier by index.
pub fn stake_tier(index: u16) -> Option<&'static StakeTier> {
    STAKE_TIERS.get(index as usize)
}

/// Lock duration of a tier, or 0 for an index outside the table.
///
/// A zero lock is never a valid stake, so callers that derive scripts from
/// the result reject unknown tiers without a separate check.
pub fn time_lock_for(index: u16) -> u64 {
    stake_tier(index).map_or(0, |t| t.time_lock)
}
