//! Opening the ledger environment described by a [`NodeConfig`].

use stakelock_store_lmdb::{check_data_dir, LmdbEnvironment, LmdbStakeStore, Migrator};
use tracing::info;

use crate::{NodeConfig, NodeError};

/// Open (or create) the LMDB environment and bring its schema up to date.
pub fn open_environment(config: &NodeConfig) -> Result<LmdbEnvironment, NodeError> {
    check_data_dir(&config.data_dir).map_err(NodeError::DataDir)?;
    let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_max_dbs, config.lmdb_map_size)?;
    let found = Migrator::run(&env.meta_store())?;
    info!(data_dir = %config.data_dir.display(), schema_found = found, "stake ledger ready");
    Ok(env)
}

/// Stake store over `env` with the configured cache sizes.
pub fn stake_store(config: &NodeConfig, env: &LmdbEnvironment) -> LmdbStakeStore {
    env.stake_store_with_capacity(config.holder_cache_capacity, config.range_cache_capacity)
}
