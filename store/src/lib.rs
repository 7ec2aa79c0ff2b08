//! Abstract storage traits for the stake ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the workspace depends only on the traits.

pub mod error;
pub mod meta;
pub mod stake;

pub use error::StoreError;
pub use meta::MetaStore;
pub use stake::{
    in_expiry_cohort, validate_ingest, StakeRecord, StakeStore, StakeTotals, COHORT_SKEW_SECS,
    DEFAULT_CACHE_CAPACITY, SECONDS_PER_DAY,
};
