//! Stake ledger node glue.
//!
//! Wires the commitment protocol to the ledger store:
//! - Loads node configuration
//! - Opens the LMDB environment and runs schema migrations
//! - Indexes stake creations and spends block by block
//! - Selects the daily auto-withdraw cohort

pub mod config;
pub mod error;
pub mod stake_indexer;
pub mod storage;
pub mod withdraw_scheduler;

pub use config::{AutoWithdrawSettings, NodeConfig};
pub use error::NodeError;
pub use stake_indexer::{BlockStakeInput, IngestSummary, StakeIndexer};
pub use storage::{open_environment, stake_store};
pub use withdraw_scheduler::WithdrawScheduler;
