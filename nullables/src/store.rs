//! Nullable stake store: thread-safe in-memory ledger for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use stakelock_store::{
    in_expiry_cohort, validate_ingest, StakeRecord, StakeStore, StakeTotals, StoreError,
};
use stakelock_types::{BlockHeight, CoinId, PuzzleHash, Timestamp};

/// In-memory [`StakeStore`] with the same observable behaviour as the LMDB
/// backend, minus caching.
///
/// Rows are kept ordered by coin name so list results match the backend's
/// ordering.
pub struct NullStakeStore {
    records: Mutex<BTreeMap<CoinId, StakeRecord>>,
    fail_writes: bool,
}

impl NullStakeStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_writes: false,
        }
    }

    /// A store whose mutating calls always fail with a backend error.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_writes: true,
        }
    }

    /// Snapshot of every row, ordered by coin name.
    pub fn all_records(&self) -> Vec<StakeRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("null store rejects writes".to_string()));
        }
        Ok(())
    }

    fn select(&self, keep: impl Fn(&StakeRecord) -> bool) -> Vec<StakeRecord> {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

impl Default for NullStakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeStore for NullStakeStore {
    fn ingest_block(
        &self,
        height: BlockHeight,
        additions: &[StakeRecord],
        removals: &[CoinId],
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        validate_ingest(height, additions, removals)?;

        let mut records = self.records.lock().unwrap();
        // staged on a copy so a failure leaves the table untouched
        let mut next = records.clone();
        for record in additions {
            if next.contains_key(&record.coin_name) {
                return Err(StoreError::Duplicate(record.coin_name.to_string()));
            }
            next.insert(record.coin_name, record.clone());
        }
        for coin in removals {
            let Some(record) = next.get_mut(coin) else {
                continue;
            };
            if record.is_spent() {
                continue;
            }
            if height <= record.confirmed_index {
                return Err(StoreError::Corruption(format!(
                    "coin {} confirmed at {} cannot be spent at {}",
                    coin, record.confirmed_index, height
                )));
            }
            record.spent_index = height;
        }
        *records = next;
        Ok(())
    }

    fn rollback_to(&self, height: i64) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        records.retain(|_, r| i64::from(r.confirmed_index) <= height);
        for record in records.values_mut() {
            if i64::from(record.spent_index) > height {
                record.spent_index = 0;
            }
        }
        Ok(())
    }

    fn total_active_stake(&self, at: Timestamp) -> Result<StakeTotals, StoreError> {
        let mut totals = StakeTotals::default();
        for record in self.select(|r| !r.is_expired(at)) {
            totals.add(&record);
        }
        Ok(totals)
    }

    fn range_by_expiry_bucket(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StakeRecord>, StoreError> {
        let mut found = self.select(|r| in_expiry_cohort(r.expiration, start, end));
        found.sort_by_key(|r| (r.expiration, r.coin_name));
        Ok(found)
    }

    fn records_confirmed_at(&self, height: BlockHeight) -> Result<Vec<StakeRecord>, StoreError> {
        Ok(self.select(|r| r.confirmed_index == height))
    }

    fn records_for_puzzle_hash(
        &self,
        puzzle_hash: &PuzzleHash,
    ) -> Result<Vec<StakeRecord>, StoreError> {
        Ok(self.select(|r| r.puzzle_hash == *puzzle_hash))
    }

    fn get_record(&self, coin_name: &CoinId) -> Result<Option<StakeRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(coin_name).cloned())
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}
