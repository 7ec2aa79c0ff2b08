//! LMDB implementation of StakeStore.
//!
//! Databases (see [`crate::environment`]):
//! - `stake_records`: `coin(32)` → bincode [`StakeRecord`]
//! - `stake_confirmed`: `confirmed_index_be(4) ++ coin(32)` → empty
//! - `stake_spent`: `spent_index_be(4) ++ coin(32)` → empty, spent rows only
//! - `stake_type`: `stake_type_be(2) ++ coin(32)` → empty
//! - `stake_puzzle_hash`: `puzzle_hash(32) ++ coin(32)` → empty
//! - `stake_expiration`: `expiration_be(8) ++ coin(32)` → empty
//!
//! Two LRU caches sit in front of the holder and expiry-window queries. The
//! writer never locks a cache: after a commit it replaces the shared pointer
//! with an empty cache. A reader takes the current cache before opening its
//! read transaction and fills that same cache, so rows read under an older
//! snapshot can only land in a cache that has already been replaced.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use stakelock_store::{
    in_expiry_cohort, validate_ingest, StakeRecord, StakeStore, StakeTotals, StoreError,
};
use stakelock_types::{BlockHeight, CoinId, PuzzleHash, Timestamp};

use crate::environment::StakeDatabases;
use crate::keys::{
    coin_suffix, expiration_key, expiration_prefix, height_key, prefix_bounds, puzzle_hash_key,
    stake_type_key,
};
use crate::LmdbError;

type RangeKey = (Timestamp, Timestamp);

/// An LRU cache whose whole contents the writer swaps out at once.
struct SwapCache<K: std::hash::Hash + Eq> {
    current: RwLock<Arc<Mutex<LruCache<K, Vec<StakeRecord>>>>>,
    capacity: NonZeroUsize,
}

impl<K: std::hash::Hash + Eq> SwapCache<K> {
    fn new(capacity: NonZeroUsize) -> Self {
        Self {
            current: RwLock::new(Arc::new(Mutex::new(LruCache::new(capacity)))),
            capacity,
        }
    }

    fn snapshot(&self) -> Arc<Mutex<LruCache<K, Vec<StakeRecord>>>> {
        Arc::clone(&self.current.read())
    }

    fn replace(&self) {
        *self.current.write() = Arc::new(Mutex::new(LruCache::new(self.capacity)));
    }

    fn len(&self) -> usize {
        self.snapshot().lock().len()
    }
}

pub struct LmdbStakeStore {
    env: Arc<Env>,
    dbs: StakeDatabases,
    holder_cache: SwapCache<PuzzleHash>,
    range_cache: SwapCache<RangeKey>,
}

impl LmdbStakeStore {
    pub(crate) fn new(
        env: Arc<Env>,
        dbs: StakeDatabases,
        holder_capacity: NonZeroUsize,
        range_capacity: NonZeroUsize,
    ) -> Self {
        Self {
            env,
            dbs,
            holder_cache: SwapCache::new(holder_capacity),
            range_cache: SwapCache::new(range_capacity),
        }
    }

    /// Entries currently held by the holder and expiry-window caches.
    pub fn cache_len(&self) -> (usize, usize) {
        (self.holder_cache.len(), self.range_cache.len())
    }

    /// Every record, ordered by coin name.
    pub fn all_records(&self) -> Result<Vec<StakeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        for entry in self.dbs.records.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, value) = entry.map_err(LmdbError::from)?;
            records.push(bincode::deserialize(value).map_err(LmdbError::from)?);
        }
        Ok(records)
    }

    fn load(&self, txn: &RoTxn<'_>, coin: &CoinId) -> Result<Option<StakeRecord>, LmdbError> {
        match self.dbs.records.get(txn, coin.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the records named by the coin suffixes of `keys`.
    fn load_all(&self, txn: &RoTxn<'_>, keys: &[Vec<u8>]) -> Result<Vec<StakeRecord>, LmdbError> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let coin = coin_suffix(key)
                .ok_or_else(|| LmdbError::Schema(format!("short index key of {} bytes", key.len())))?;
            let record = self.load(txn, &coin)?.ok_or_else(|| {
                LmdbError::Schema(format!("index entry for missing record {}", coin))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn write_row(&self, wtxn: &mut RwTxn<'_>, record: &StakeRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.dbs
            .records
            .put(wtxn, record.coin_name.as_bytes(), &bytes)?;
        Ok(())
    }

    fn insert(&self, wtxn: &mut RwTxn<'_>, record: &StakeRecord) -> Result<(), LmdbError> {
        let coin = &record.coin_name;
        self.write_row(wtxn, record)?;
        self.dbs
            .confirmed
            .put(wtxn, &height_key(record.confirmed_index, coin), &[])?;
        self.dbs
            .stake_type
            .put(wtxn, &stake_type_key(record.stake_type, coin), &[])?;
        self.dbs
            .puzzle_hash
            .put(wtxn, &puzzle_hash_key(&record.puzzle_hash, coin), &[])?;
        self.dbs
            .expiration
            .put(wtxn, &expiration_key(record.expiration, coin), &[])?;
        if record.is_spent() {
            self.dbs
                .spent
                .put(wtxn, &height_key(record.spent_index, coin), &[])?;
        }
        Ok(())
    }

    fn remove(&self, wtxn: &mut RwTxn<'_>, record: &StakeRecord) -> Result<(), LmdbError> {
        let coin = &record.coin_name;
        self.dbs.records.delete(wtxn, coin.as_bytes())?;
        self.dbs
            .confirmed
            .delete(wtxn, &height_key(record.confirmed_index, coin))?;
        self.dbs
            .stake_type
            .delete(wtxn, &stake_type_key(record.stake_type, coin))?;
        self.dbs
            .puzzle_hash
            .delete(wtxn, &puzzle_hash_key(&record.puzzle_hash, coin))?;
        self.dbs
            .expiration
            .delete(wtxn, &expiration_key(record.expiration, coin))?;
        if record.is_spent() {
            self.dbs
                .spent
                .delete(wtxn, &height_key(record.spent_index, coin))?;
        }
        Ok(())
    }

    /// Keys of `db` in `bounds`, collected so the caller may write afterwards.
    fn keys_in(
        db: Database<Bytes, Bytes>,
        txn: &RoTxn<'_>,
        bounds: (Bound<Vec<u8>>, Bound<Vec<u8>>),
    ) -> Result<Vec<Vec<u8>>, LmdbError> {
        let bounds = (as_slice_bound(&bounds.0), as_slice_bound(&bounds.1));
        let mut keys = Vec::new();
        for entry in db.range(txn, &bounds)? {
            let (key, _) = entry?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Index keys whose leading field sorts strictly above `floor`.
    fn keys_above(
        db: Database<Bytes, Bytes>,
        txn: &RoTxn<'_>,
        floor: &[u8],
    ) -> Result<Vec<Vec<u8>>, LmdbError> {
        // Anything starting with a larger field value sorts after every key
        // that starts with `floor`.
        let lower = match crate::keys::increment_prefix(floor) {
            Some(lower) => lower,
            None => return Ok(Vec::new()),
        };
        Self::keys_in(db, txn, (Bound::Included(lower), Bound::Unbounded))
    }

    fn invalidate_caches(&self) {
        self.holder_cache.replace();
        self.range_cache.replace();
    }
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    match bound {
        Bound::Included(k) => Bound::Included(k.as_slice()),
        Bound::Excluded(k) => Bound::Excluded(k.as_slice()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

impl StakeStore for LmdbStakeStore {
    fn ingest_block(
        &self,
        height: BlockHeight,
        additions: &[StakeRecord],
        removals: &[CoinId],
    ) -> Result<(), StoreError> {
        validate_ingest(height, additions, removals)?;

        // Dropping the transaction on any early return aborts the block.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut touched: HashSet<PuzzleHash> = HashSet::new();

        for record in additions {
            if self
                .dbs
                .records
                .get(&wtxn, record.coin_name.as_bytes())
                .map_err(LmdbError::from)?
                .is_some()
            {
                return Err(StoreError::Duplicate(record.coin_name.to_string()));
            }
            self.insert(&mut wtxn, record)?;
            touched.insert(record.puzzle_hash);
        }

        let mut marked = 0usize;
        for coin in removals {
            let Some(mut record) = self.load(&wtxn, coin)? else {
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
            self.write_row(&mut wtxn, &record)?;
            self.dbs
                .spent
                .put(&mut wtxn, &height_key(height, coin), &[])
                .map_err(LmdbError::from)?;
            touched.insert(record.puzzle_hash);
            marked += 1;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        if !touched.is_empty() {
            self.holder_cache.replace();
        }

        debug!(height, added = additions.len(), spent = marked, "ingested stake block");
        Ok(())
    }

    fn rollback_to(&self, height: i64) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut deleted = 0usize;
        let mut unspent = 0usize;

        if height < 0 {
            deleted = self.dbs.records.len(&wtxn).map_err(LmdbError::from)? as usize;
            self.dbs.records.clear(&mut wtxn).map_err(LmdbError::from)?;
            for index in self.dbs.indexes() {
                index.clear(&mut wtxn).map_err(LmdbError::from)?;
            }
        } else if let Ok(floor) = BlockHeight::try_from(height) {
            let floor = floor.to_be_bytes();

            let confirmed = Self::keys_above(self.dbs.confirmed, &wtxn, &floor)?;
            for record in self.load_all(&wtxn, &confirmed)? {
                self.remove(&mut wtxn, &record)?;
                deleted += 1;
            }

            let spent = Self::keys_above(self.dbs.spent, &wtxn, &floor)?;
            for key in &spent {
                self.dbs
                    .spent
                    .delete(&mut wtxn, key)
                    .map_err(LmdbError::from)?;
                let Some(coin) = coin_suffix(key) else {
                    continue;
                };
                if let Some(mut record) = self.load(&wtxn, &coin)? {
                    record.spent_index = 0;
                    self.write_row(&mut wtxn, &record)?;
                    unspent += 1;
                }
            }
        }

        wtxn.commit().map_err(LmdbError::from)?;
        self.invalidate_caches();

        info!(height, deleted, unspent, "stake ledger rolled back");
        Ok(())
    }

    fn total_active_stake(&self, at: Timestamp) -> Result<StakeTotals, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = Self::keys_above(self.dbs.expiration, &rtxn, &at.as_secs().to_be_bytes())?;
        let mut totals = StakeTotals::default();
        for record in self.load_all(&rtxn, &keys)? {
            totals.add(&record);
        }
        Ok(totals)
    }

    fn range_by_expiry_bucket(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StakeRecord>, StoreError> {
        let cache = self.range_cache.snapshot();
        if let Some(hit) = cache.lock().get(&(start, end)) {
            return Ok(hit.clone());
        }

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys: Vec<Vec<u8>> =
            Self::keys_above(self.dbs.expiration, &rtxn, &end.as_secs().to_be_bytes())?
                .into_iter()
                .filter(|key| {
                    expiration_prefix(key)
                        .is_some_and(|expiration| in_expiry_cohort(expiration, start, end))
                })
                .collect();
        let records = self.load_all(&rtxn, &keys)?;
        drop(rtxn);

        cache.lock().put((start, end), records.clone());
        Ok(records)
    }

    fn records_confirmed_at(&self, height: BlockHeight) -> Result<Vec<StakeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = Self::keys_in(
            self.dbs.confirmed,
            &rtxn,
            prefix_bounds(&height.to_be_bytes()),
        )?;
        Ok(self.load_all(&rtxn, &keys)?)
    }

    fn records_for_puzzle_hash(
        &self,
        puzzle_hash: &PuzzleHash,
    ) -> Result<Vec<StakeRecord>, StoreError> {
        let cache = self.holder_cache.snapshot();
        if let Some(hit) = cache.lock().get(puzzle_hash) {
            return Ok(hit.clone());
        }

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let keys = Self::keys_in(
            self.dbs.puzzle_hash,
            &rtxn,
            prefix_bounds(puzzle_hash.as_bytes()),
        )?;
        let records = self.load_all(&rtxn, &keys)?;
        drop(rtxn);

        cache.lock().put(*puzzle_hash, records.clone());
        Ok(records)
    }

    fn get_record(&self, coin_name: &CoinId) -> Result<Option<StakeRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.load(&rtxn, coin_name)?)
    }

    fn record_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.dbs.records.len(&rtxn).map_err(LmdbError::from)?)
    }
}
