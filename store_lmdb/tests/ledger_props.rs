use proptest::prelude::*;

use stakelock_store::{StakeRecord, StakeStore, StakeTotals};
use stakelock_store_lmdb::LmdbEnvironment;
use stakelock_types::{Bytes32, Coin, CoinId, Timestamp};

/// One generated block: new stakes as `(holder, amount, tier)` and indexes of
/// earlier coins to spend.
type BlockPlan = (Vec<(u8, u64, u16)>, Vec<usize>);

fn blocks() -> impl Strategy<Value = Vec<BlockPlan>> {
    prop::collection::vec(
        (
            prop::collection::vec((0u8..4, 1u64..1_000_000, 0u16..12), 0..4),
            prop::collection::vec(0usize..64, 0..3),
        ),
        1..8,
    )
}

fn apply(store: &impl StakeStore, plan: &[BlockPlan]) -> Vec<CoinId> {
    let mut coins: Vec<CoinId> = Vec::new();
    for (i, (adds, spends)) in plan.iter().enumerate() {
        let height = i as u32 + 1;
        let records: Vec<StakeRecord> = adds
            .iter()
            .enumerate()
            .map(|(j, &(holder, amount, tier))| {
                let mut parent = [0u8; 32];
                parent[..4].copy_from_slice(&height.to_be_bytes());
                parent[4] = j as u8;
                let coin = Coin::new(Bytes32::new(parent), Bytes32::new([holder; 32]), amount);
                StakeRecord::confirmed(&coin, tier, height, Timestamp::new(height as u64 * 600))
                    .unwrap()
            })
            .collect();
        let removals: Vec<CoinId> = spends
            .iter()
            .filter_map(|&k| coins.get(k % coins.len().max(1)).copied())
            .collect();
        store.ingest_block(height, &records, &removals).unwrap();
        coins.extend(records.iter().map(|r| r.coin_name));
    }
    coins
}

proptest! {
    /// Rolling back to height k leaves exactly what ingesting blocks 1..=k left.
    #[test]
    fn rollback_is_inverse_of_ingest(plan in blocks(), cut in 0usize..8) {
        let cut = cut.min(plan.len());

        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let store = env.stake_store();
        apply(&store, &plan[..cut]);
        let expected = store.all_records().unwrap();

        let other = tempfile::tempdir().unwrap();
        let full_env = LmdbEnvironment::open(other.path(), 16, 1 << 24).unwrap();
        let full = full_env.stake_store();
        apply(&full, &plan);
        full.rollback_to(cut as i64).unwrap();

        prop_assert_eq!(full.all_records().unwrap(), expected);
        prop_assert_eq!(full.cache_len(), (0, 0));
    }

    /// Active totals agree with a direct scan of the rows.
    #[test]
    fn totals_match_row_scan(plan in blocks(), at in 0u64..(400 * 86_400)) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let store = env.stake_store();
        apply(&store, &plan);

        let at = Timestamp::new(at);
        let mut expected = StakeTotals::default();
        for record in store.all_records().unwrap() {
            if !record.is_expired(at) {
                expected.add(&record);
            }
        }
        prop_assert_eq!(store.total_active_stake(at).unwrap(), expected);
    }

    /// The holder query returns exactly the rows locked to that holder.
    #[test]
    fn holder_query_matches_scan(plan in blocks(), holder in 0u8..4) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let store = env.stake_store();
        apply(&store, &plan);

        let puzzle_hash = Bytes32::new([holder; 32]);
        let expected: Vec<_> = store
            .all_records()
            .unwrap()
            .into_iter()
            .filter(|r| r.puzzle_hash == puzzle_hash)
            .collect();
        prop_assert_eq!(store.records_for_puzzle_hash(&puzzle_hash).unwrap(), expected.clone());
        // served from the cache the second time
        prop_assert_eq!(store.records_for_puzzle_hash(&puzzle_hash).unwrap(), expected);
    }
}
