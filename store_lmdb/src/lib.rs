//! LMDB storage backend for the stake ledger.
//!
//! Implements the traits from `stakelock-store` using the `heed` LMDB
//! bindings. The stake table is one primary database plus one database per
//! secondary index, all inside a single environment so every mutation is one
//! write transaction.

pub mod environment;
pub mod error;
pub mod integrity;
mod keys;
pub mod meta;
pub mod migration;
pub mod stake;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use stake::LmdbStakeStore;
