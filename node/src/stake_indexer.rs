//! Block ingestion into the stake ledger.
//!
//! For each block the indexer classifies every spend, turns coins created at
//! a validated lock puzzle hash into [`StakeRecord`]s and hands the block to
//! the store as one ingest call. Every spent coin id is passed as a removal;
//! the store ignores ids it does not track.

use std::collections::HashMap;

use stakelock_protocol::{match_from_spend, StakeMetadata};
use stakelock_script::ScriptEvaluator;
use stakelock_store::{StakeRecord, StakeStore};
use stakelock_types::{BlockHeight, Coin, CoinId, CoinSpend, PuzzleHash, Timestamp};
use tracing::{debug, info, warn};

use crate::NodeError;

/// The parts of a confirmed block the stake ledger cares about.
#[derive(Clone, Debug, Default)]
pub struct BlockStakeInput {
    pub height: BlockHeight,
    /// Block timestamp; stake expirations are measured from it.
    pub timestamp: Timestamp,
    pub additions: Vec<Coin>,
    pub spends: Vec<CoinSpend>,
}

/// What one call to [`StakeIndexer::process_block`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub height: BlockHeight,
    pub stakes_created: usize,
    pub stake_amount: u128,
    pub spends_seen: usize,
    /// Spends whose puzzle could not be run; treated as non-stake spends.
    pub unclassified: usize,
}

pub struct StakeIndexer<S, E> {
    store: S,
    evaluator: E,
}

impl<S: StakeStore, E: ScriptEvaluator> StakeIndexer<S, E> {
    pub fn new(store: S, evaluator: E) -> Self {
        Self { store, evaluator }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn process_block(&self, block: &BlockStakeInput) -> Result<IngestSummary, NodeError> {
        let mut summary = IngestSummary {
            height: block.height,
            spends_seen: block.spends.len(),
            ..IngestSummary::default()
        };

        // parent coin id → (metadata, lock puzzle hash) of stake-creating spends
        let mut creations: HashMap<CoinId, (StakeMetadata, PuzzleHash)> = HashMap::new();
        for spend in &block.spends {
            match match_from_spend(spend, &self.evaluator) {
                Ok((Some(metadata), Some(lock_hash))) => {
                    creations.insert(spend.coin.name(), (metadata, lock_hash));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(coin = %spend.coin.name(), height = block.height, %err, "could not classify spend");
                    summary.unclassified += 1;
                }
            }
        }

        let mut records = Vec::new();
        for coin in &block.additions {
            let Some((metadata, lock_hash)) = creations.get(&coin.parent_coin_info) else {
                continue;
            };
            if coin.puzzle_hash != *lock_hash {
                continue;
            }
            let record =
                StakeRecord::confirmed(coin, metadata.stake_type, block.height, block.timestamp)
                    .map_err(|e| NodeError::InvalidBlock(e.to_string()))?;
            debug!(
                coin = %record.coin_name,
                amount = record.amount,
                stake_type = record.stake_type,
                expiration = %record.expiration,
                "stake confirmed"
            );
            summary.stake_amount += record.amount as u128;
            records.push(record);
        }
        summary.stakes_created = records.len();

        let removals: Vec<CoinId> = block.spends.iter().map(|s| s.coin.name()).collect();
        self.store.ingest_block(block.height, &records, &removals)?;

        if summary.stakes_created > 0 {
            info!(
                height = block.height,
                stakes = summary.stakes_created,
                amount = %summary.stake_amount,
                "indexed stake block"
            );
        }
        Ok(summary)
    }

    /// Undo every block above `height`. A negative height empties the ledger.
    pub fn rollback_to(&self, height: i64) -> Result<(), NodeError> {
        self.store.rollback_to(height)?;
        Ok(())
    }
}
