//! Stake ledger records and the storage trait backends implement.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use stakelock_types::coefficient::COEFFICIENT_SCALE;
use stakelock_types::{
    stake_tier, BlockHeight, Coefficient, Coin, CoinId, PuzzleHash, StakeError, Timestamp,
};

use crate::StoreError;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Offset applied to both ends of a daily expiry cohort window.
pub const COHORT_SKEW_SECS: u64 = 300;

/// Entries per lookup cache (holder scope and expiry window).
pub const DEFAULT_CACHE_CAPACITY: usize = 104;

/// One stake coin's lifecycle.
///
/// `coefficient` is copied from the tier table at confirmation so later
/// table edits never change historical accounting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub coin_name: CoinId,
    pub puzzle_hash: PuzzleHash,
    pub amount: u64,
    pub confirmed_index: BlockHeight,
    /// 0 while unspent, otherwise greater than `confirmed_index`.
    pub spent_index: BlockHeight,
    pub stake_type: u16,
    pub coefficient: Coefficient,
    pub expiration: Timestamp,
}

impl StakeRecord {
    /// Record for a stake coin confirmed at `height` in a block stamped `timestamp`.
    pub fn confirmed(
        coin: &Coin,
        stake_type: u16,
        height: BlockHeight,
        timestamp: Timestamp,
    ) -> Result<Self, StakeError> {
        let tier = stake_tier(stake_type).ok_or(StakeError::UnknownTier(stake_type))?;
        Ok(Self {
            coin_name: coin.name(),
            puzzle_hash: coin.puzzle_hash,
            amount: coin.amount,
            confirmed_index: height,
            spent_index: 0,
            stake_type,
            coefficient: tier.coefficient,
            expiration: timestamp.saturating_add(tier.time_lock),
        })
    }

    pub fn is_spent(&self) -> bool {
        self.spent_index != 0
    }

    /// A stake is active while `expiration > now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration <= now
    }

    /// `floor(amount × coefficient)`.
    pub fn weighted_amount(&self) -> u128 {
        self.coefficient.apply(self.amount)
    }

    /// `amount × coefficient`, scaled by the coefficient scale.
    pub fn weighted_amount_scaled(&self) -> u128 {
        self.coefficient.apply_scaled(self.amount)
    }
}

/// Aggregate over active stakes, kept exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StakeTotals {
    pub amount: u128,
    /// Σ amount × coefficient, scaled by the coefficient scale.
    pub weighted_scaled: u128,
}

impl StakeTotals {
    pub fn add(&mut self, record: &StakeRecord) {
        self.amount += record.amount as u128;
        self.weighted_scaled += record.weighted_amount_scaled();
    }

    /// Weighted total for display; lossy.
    pub fn weighted(&self) -> f64 {
        self.weighted_scaled as f64 / COEFFICIENT_SCALE as f64
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.weighted_scaled == 0
    }
}

/// Daily auto-withdraw cohort membership.
///
/// A record belongs to the window `(start, end)` when it expires after `end`
/// and its expiry time of day lies in
/// `[start % day + skew, end % day + skew)`.
pub fn in_expiry_cohort(expiration: Timestamp, start: Timestamp, end: Timestamp) -> bool {
    let time_of_day = expiration.time_of_day();
    expiration > end
        && time_of_day >= start.time_of_day() + COHORT_SKEW_SECS
        && time_of_day < end.time_of_day() + COHORT_SKEW_SECS
}

/// Argument checks shared by every [`StakeStore::ingest_block`] backend.
pub fn validate_ingest(
    height: BlockHeight,
    additions: &[StakeRecord],
    removals: &[CoinId],
) -> Result<(), StoreError> {
    if height == 0 && !removals.is_empty() {
        return Err(StoreError::InvalidArgument(
            "spends cannot be marked at height 0".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(additions.len());
    for record in additions {
        if record.confirmed_index != height {
            return Err(StoreError::InvalidArgument(format!(
                "record {} confirmed at {} ingested at height {}",
                record.coin_name, record.confirmed_index, height
            )));
        }
        if record.spent_index != 0 {
            return Err(StoreError::InvalidArgument(format!(
                "record {} ingested already spent",
                record.coin_name
            )));
        }
        if !seen.insert(record.coin_name) {
            return Err(StoreError::Duplicate(record.coin_name.to_string()));
        }
    }
    Ok(())
}

/// Persistent stake ledger.
///
/// Mutating calls run in one write transaction each; readers never observe
/// a partially applied block or rollback.
pub trait StakeStore {
    /// Insert the stakes confirmed at `height` and mark `removals` spent.
    ///
    /// A coin id already present (or repeated within `additions`) fails the
    /// whole call with [`StoreError::Duplicate`]. Only unspent rows are
    /// marked; unknown ids and already-spent rows are left alone, so
    /// replaying the same removals is harmless.
    fn ingest_block(
        &self,
        height: BlockHeight,
        additions: &[StakeRecord],
        removals: &[CoinId],
    ) -> Result<(), StoreError>;

    /// Undo every block above `height`. A negative height empties the table.
    fn rollback_to(&self, height: i64) -> Result<(), StoreError>;

    /// Totals over records with `expiration > at`. Never cached.
    fn total_active_stake(&self, at: Timestamp) -> Result<StakeTotals, StoreError>;

    /// Records in the daily cohort for `(start, end)` (see
    /// [`in_expiry_cohort`]), ordered by `(expiration, coin_name)`.
    fn range_by_expiry_bucket(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StakeRecord>, StoreError>;

    /// Records confirmed at exactly `height`, ordered by coin name.
    fn records_confirmed_at(&self, height: BlockHeight) -> Result<Vec<StakeRecord>, StoreError>;

    /// Records locked to `puzzle_hash`, ordered by coin name.
    fn records_for_puzzle_hash(
        &self,
        puzzle_hash: &PuzzleHash,
    ) -> Result<Vec<StakeRecord>, StoreError>;

    fn get_record(&self, coin_name: &CoinId) -> Result<Option<StakeRecord>, StoreError>;

    fn record_count(&self) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakelock_types::Bytes32;

    fn coin(n: u8, amount: u64) -> Coin {
        Coin::new(Bytes32::new([n; 32]), Bytes32::new([0xee; 32]), amount)
    }

    #[test]
    fn confirmed_record_copies_tier() {
        let r = StakeRecord::confirmed(&coin(1, 1000), 1, 100, Timestamp::new(1_000)).unwrap();
        assert_eq!(r.coefficient, "1.05".parse::<Coefficient>().unwrap());
        assert_eq!(r.expiration, Timestamp::new(1_000 + 30 * SECONDS_PER_DAY));
        assert_eq!(r.confirmed_index, 100);
        assert!(!r.is_spent());
        assert_eq!(r.weighted_amount_scaled(), 1000 * 10_500);
        assert_eq!(r.weighted_amount(), 1050);
    }

    #[test]
    fn weighted_amount_floors() {
        let r = StakeRecord::confirmed(&coin(1, 3), 1, 1, Timestamp::EPOCH).unwrap();
        assert_eq!(r.weighted_amount(), 3);
        assert_eq!(r.weighted_amount_scaled(), 31_500);
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert_eq!(
            StakeRecord::confirmed(&coin(1, 1), 12, 1, Timestamp::EPOCH),
            Err(StakeError::UnknownTier(12))
        );
    }

    #[test]
    fn expiry_boundary() {
        let r = StakeRecord::confirmed(&coin(1, 1), 0, 1, Timestamp::new(10)).unwrap();
        let exp = r.expiration.as_secs();
        assert!(!r.is_expired(Timestamp::new(exp - 1)));
        assert!(r.is_expired(Timestamp::new(exp)));
    }

    #[test]
    fn totals_are_exact() {
        let mut totals = StakeTotals::default();
        assert!(totals.is_empty());
        totals.add(&StakeRecord::confirmed(&coin(1, 3), 1, 1, Timestamp::EPOCH).unwrap());
        assert_eq!(totals.amount, 3);
        assert_eq!(totals.weighted_scaled, 31_500);
        assert_eq!(totals.weighted(), 3.15);
    }

    #[test]
    fn cohort_window() {
        let day = SECONDS_PER_DAY;
        let start = Timestamp::new(10 * day + 1_000);
        let end = Timestamp::new(10 * day + 2_000);
        assert!(in_expiry_cohort(Timestamp::new(20 * day + 1_300), start, end));
        assert!(!in_expiry_cohort(Timestamp::new(20 * day + 1_299), start, end));
        assert!(!in_expiry_cohort(Timestamp::new(20 * day + 2_300), start, end));
        // must expire after the window end
        assert!(!in_expiry_cohort(Timestamp::new(10 * day + 1_500), start, end));
    }

    #[test]
    fn ingest_arguments() {
        let r = StakeRecord::confirmed(&coin(1, 1), 0, 5, Timestamp::EPOCH).unwrap();
        assert!(validate_ingest(5, &[r.clone()], &[]).is_ok());
        assert!(matches!(
            validate_ingest(5, &[r.clone(), r.clone()], &[]),
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            validate_ingest(6, &[r.clone()], &[]),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_ingest(0, &[], &[r.coin_name]),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(validate_ingest(0, &[], &[]).is_ok());
    }
}
