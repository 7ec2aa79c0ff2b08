//! LMDB environment setup.

use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use stakelock_store::DEFAULT_CACHE_CAPACITY;

use crate::meta::LmdbMetaStore;
use crate::stake::LmdbStakeStore;
use crate::LmdbError;

/// Named databases created in every environment.
pub const STAKE_RECORDS_DB: &str = "stake_records";
pub const STAKE_CONFIRMED_DB: &str = "stake_confirmed";
pub const STAKE_SPENT_DB: &str = "stake_spent";
pub const STAKE_TYPE_DB: &str = "stake_type";
pub const STAKE_PUZZLE_HASH_DB: &str = "stake_puzzle_hash";
pub const STAKE_EXPIRATION_DB: &str = "stake_expiration";
pub const META_DB: &str = "meta";

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_CAPACITY) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

pub const DATABASE_NAMES: &[&str] = &[
    STAKE_RECORDS_DB,
    STAKE_CONFIRMED_DB,
    STAKE_SPENT_DB,
    STAKE_TYPE_DB,
    STAKE_PUZZLE_HASH_DB,
    STAKE_EXPIRATION_DB,
    META_DB,
];

/// Handles to the stake table and its indexes.
#[derive(Clone, Copy)]
pub(crate) struct StakeDatabases {
    /// coin(32) → bincode `StakeRecord`
    pub records: Database<Bytes, Bytes>,
    pub confirmed: Database<Bytes, Bytes>,
    pub spent: Database<Bytes, Bytes>,
    pub stake_type: Database<Bytes, Bytes>,
    pub puzzle_hash: Database<Bytes, Bytes>,
    pub expiration: Database<Bytes, Bytes>,
}

impl StakeDatabases {
    /// Index databases, in the order they are cleared on a full rollback.
    pub fn indexes(&self) -> [Database<Bytes, Bytes>; 5] {
        [
            self.confirmed,
            self.spent,
            self.stake_type,
            self.puzzle_hash,
            self.expiration,
        ]
    }
}

/// Wraps the LMDB environment and all database handles.
///
/// Dropping it closes the environment once every store handed out by it has
/// been dropped too. Until then a second open of the same path fails.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) stake: StakeDatabases,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at `path`, creating every stake
    /// database that does not exist yet.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process and the data
        // file is not modified by anything outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut create = |name: &str| env.create_database::<Bytes, Bytes>(&mut wtxn, Some(name));
        let stake = StakeDatabases {
            records: create(STAKE_RECORDS_DB)?,
            confirmed: create(STAKE_CONFIRMED_DB)?,
            spent: create(STAKE_SPENT_DB)?,
            stake_type: create(STAKE_TYPE_DB)?,
            puzzle_hash: create(STAKE_PUZZLE_HASH_DB)?,
            expiration: create(STAKE_EXPIRATION_DB)?,
        };
        let meta_db = create(META_DB)?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, max_dbs, "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            stake,
            meta_db,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Stake store with the default cache capacities.
    pub fn stake_store(&self) -> LmdbStakeStore {
        self.stake_store_with_capacity(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_CAPACITY)
    }

    /// Stake store with explicit holder and expiry-window cache sizes.
    /// A zero capacity falls back to the default.
    pub fn stake_store_with_capacity(&self, holder: usize, range: usize) -> LmdbStakeStore {
        let capacity = |n: usize| NonZeroUsize::new(n).unwrap_or(DEFAULT_CAPACITY);
        LmdbStakeStore::new(
            Arc::clone(&self.env),
            self.stake,
            capacity(holder),
            capacity(range),
        )
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}

impl Drop for LmdbEnvironment {
    fn drop(&mut self) {
        // heed keeps an environment registered until it is prepared for
        // closing; LMDB releases the map when the last handle goes.
        let _ = self.env.as_ref().clone().prepare_for_closing();
        tracing::debug!(path = %self.env.path().display(), "closing LMDB environment");
    }
}
