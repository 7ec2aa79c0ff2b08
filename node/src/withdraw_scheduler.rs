//! Daily auto-withdraw cohorts.
//!
//! Once per check window the wallet asks which stakes belong to the window's
//! daily cohort and withdraws them in fixed-size batches. Building and
//! submitting the withdrawal transactions happens outside this crate.

use stakelock_store::{StakeRecord, StakeStore};
use stakelock_types::Timestamp;
use tracing::debug;

use crate::config::AutoWithdrawSettings;
use crate::NodeError;

pub struct WithdrawScheduler {
    settings: AutoWithdrawSettings,
}

impl WithdrawScheduler {
    pub fn new(settings: AutoWithdrawSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AutoWithdrawSettings {
        &self.settings
    }

    /// Unspent stakes of the `(window_start, window_end)` cohort, split into
    /// batches of at most `batch_size`. Empty when auto-withdraw is disabled.
    pub fn due_batches<S: StakeStore + ?Sized>(
        &self,
        store: &S,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<Vec<StakeRecord>>, NodeError> {
        if !self.settings.enabled {
            return Ok(Vec::new());
        }
        let due: Vec<StakeRecord> = store
            .range_by_expiry_bucket(window_start, window_end)?
            .into_iter()
            .filter(|r| !r.is_spent())
            .collect();

        let batch_size = self.settings.batch_size.max(1);
        let batches: Vec<Vec<StakeRecord>> =
            due.chunks(batch_size).map(|chunk| chunk.to_vec()).collect();
        debug!(
            start = %window_start,
            end = %window_end,
            due = due.len(),
            batches = batches.len(),
            "auto-withdraw cohort"
        );
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakelock_nullables::NullStakeStore;
    use stakelock_types::{Bytes32, Coin};

    const DAY: u64 = 86_400;

    fn settings(enabled: bool, batch_size: usize) -> AutoWithdrawSettings {
        AutoWithdrawSettings {
            enabled,
            tx_fee: 0,
            batch_size,
        }
    }

    /// Five tier-0 stakes confirmed at 00:25 UTC on day 3, so they expire at
    /// 00:25 on day 10.
    fn populated() -> (NullStakeStore, Vec<StakeRecord>) {
        let store = NullStakeStore::new();
        let records: Vec<_> = (1..=5u8)
            .map(|n| {
                let coin = Coin::new(Bytes32::new([n; 32]), Bytes32::new([7; 32]), 10);
                StakeRecord::confirmed(&coin, 0, 1, Timestamp::new(3 * DAY + 1_500)).unwrap()
            })
            .collect();
        store.ingest_block(1, &records, &[]).unwrap();
        (store, records)
    }

    #[test]
    fn disabled_scheduler_yields_nothing() {
        let (store, _) = populated();
        let scheduler = WithdrawScheduler::new(AutoWithdrawSettings::default());
        let batches = scheduler
            .due_batches(&store, Timestamp::new(DAY + 1_000), Timestamp::new(DAY + 2_000))
            .unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn cohort_is_batched_and_skips_spent() {
        let (store, records) = populated();
        store.ingest_block(2, &[], &[records[0].coin_name]).unwrap();

        let scheduler = WithdrawScheduler::new(settings(true, 3));
        let batches = scheduler
            .due_batches(&store, Timestamp::new(DAY + 1_000), Timestamp::new(DAY + 2_000))
            .unwrap();
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 1]);
        assert!(batches.iter().flatten().all(|r| !r.is_spent()));
    }

    #[test]
    fn window_outside_time_of_day_is_empty() {
        let (store, _) = populated();
        let scheduler = WithdrawScheduler::new(settings(true, 50));
        let batches = scheduler
            .due_batches(&store, Timestamp::new(DAY + 5_000), Timestamp::new(DAY + 6_000))
            .unwrap();
        assert!(batches.is_empty());
    }
}
