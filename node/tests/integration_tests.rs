//! Integration tests exercising the full stake pipeline:
//! wallet decoration → spend classification → LMDB ingestion → queries →
//! rollback → unlock.
//!
//! These wire together the protocol, the indexer and the LMDB store exactly
//! as a node does, verifying the system works end-to-end and not just in
//! isolation.

use stakelock_node::{
    open_environment, stake_store, AutoWithdrawSettings, BlockStakeInput, NodeConfig,
    StakeIndexer, WithdrawScheduler,
};
use stakelock_nullables::{NullClock, NullEvaluator};
use stakelock_protocol::{
    generate_stake_spend, make_delegated_solution, Payment, StakeMetadata, StakePuzzleDecorator,
};
use stakelock_script::templates::P2_DELEGATED_MOD;
use stakelock_script::{conditions_for_solution, curry, ConditionOpcode, Program, MAX_CONDITIONS_COST};
use stakelock_store::{StakeStore, StakeTotals};
use stakelock_store_lmdb::{check_integrity, LmdbEnvironment, LmdbStakeStore};
use stakelock_types::{Bytes32, Coin, CoinSpend, Timestamp};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const WEEK: u64 = 604_800;

fn temp_config() -> (tempfile::TempDir, NodeConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = NodeConfig {
        data_dir: dir.path().join("ledger"),
        lmdb_map_size: 64 * 1024 * 1024,
        ..NodeConfig::default()
    };
    (dir, config)
}

fn wallet(key: u8) -> Program {
    curry(&P2_DELEGATED_MOD, &[Program::atom(vec![key; 48])])
}

/// Spend of a fresh wallet coin that stakes `amount` for `recipient`.
/// Returns the spend and the stake coin it creates.
fn stake_creation(parent: u8, stake_type: u16, recipient: &Program, amount: u64) -> (CoinSpend, Coin) {
    let puzzle = wallet(parent);
    let decorator = StakePuzzleDecorator::new(stake_type, recipient.tree_hash());
    let (puzzle, lock) = decorator
        .decorate_target_puzzle_hash(decorator.decorate(puzzle), &Bytes32::ZERO)
        .expect("known tier");
    let primaries = [Payment::new(lock, amount)];
    let (puzzle, solution) = decorator
        .solve(puzzle, &primaries, make_delegated_solution(&primaries, vec![]))
        .expect("single payment");

    let coin = Coin::new(Bytes32::new([parent; 32]), puzzle.tree_hash(), amount);
    let stake = Coin::new(coin.name(), lock, amount);
    (CoinSpend::new(coin, puzzle.to_bytes(), solution.to_bytes()), stake)
}

fn indexer(env: &LmdbEnvironment, config: &NodeConfig) -> StakeIndexer<LmdbStakeStore, NullEvaluator> {
    StakeIndexer::new(stake_store(config, env), NullEvaluator::new())
}

// ---------------------------------------------------------------------------
// 1. Tier-0 lifecycle
// ---------------------------------------------------------------------------

#[test]
fn tier_zero_stake_lifecycle() {
    let (_dir, config) = temp_config();
    let env = open_environment(&config).unwrap();
    let indexer = indexer(&env, &config);
    let clock = NullClock::new(1_700_000_000);

    let recipient = wallet(0x42);
    let (spend, stake) = stake_creation(1, 0, &recipient, 1000);
    let block = BlockStakeInput {
        height: 100,
        timestamp: clock.now(),
        additions: vec![stake],
        spends: vec![spend],
    };
    let summary = indexer.process_block(&block).unwrap();
    assert_eq!(summary.stakes_created, 1);

    let store = indexer.store();
    let t = clock.now().as_secs();
    let active = store.total_active_stake(Timestamp::new(t + WEEK - 1)).unwrap();
    assert_eq!(active.amount, 1000);
    assert_eq!(active.weighted(), 1000.0);
    assert_eq!(
        store.total_active_stake(Timestamp::new(t + WEEK)).unwrap(),
        StakeTotals::default()
    );

    indexer.rollback_to(99).unwrap();
    assert!(store.get_record(&stake.name()).unwrap().is_none());
    assert!(check_integrity(&env).unwrap().is_healthy());
}

// ---------------------------------------------------------------------------
// 2. Unlock of an indexed stake
// ---------------------------------------------------------------------------

#[test]
fn recipient_unlock_asserts_tier_age() {
    let recipient = wallet(0x42);
    let (_, stake) = stake_creation(1, 3, &recipient, 2_000);
    let metadata = StakeMetadata::new(3, recipient.tree_hash());

    let inner_solution =
        make_delegated_solution(&[Payment::new(Bytes32::new([0x99; 32]), 2_000)], vec![]);
    let spend = generate_stake_spend(&stake, &metadata, &recipient, &inner_solution).unwrap();

    let puzzle = Program::from_bytes(&spend.puzzle_reveal).unwrap();
    let solution = Program::from_bytes(&spend.solution).unwrap();
    let conds =
        conditions_for_solution(&NullEvaluator::new(), &puzzle, &solution, MAX_CONDITIONS_COST)
            .unwrap();
    assert_eq!(conds[0].opcode, ConditionOpcode::AssertSecondsRelative);
    assert_eq!(
        Program::atom(conds[0].vars[0].clone()).as_u64(),
        Some(180 * 86_400)
    );
}

// ---------------------------------------------------------------------------
// 3. Rollback restores the exact earlier ledger
// ---------------------------------------------------------------------------

#[test]
fn rollback_restores_earlier_ledger() {
    let (_dir, config) = temp_config();
    let env = open_environment(&config).unwrap();
    let indexer = indexer(&env, &config);
    let recipient = wallet(0x42);

    let (spend_a, stake_a) = stake_creation(1, 0, &recipient, 100);
    let (spend_b, stake_b) = stake_creation(2, 1, &recipient, 200);
    indexer
        .process_block(&BlockStakeInput {
            height: 1,
            timestamp: Timestamp::new(10_000),
            additions: vec![stake_a],
            spends: vec![spend_a],
        })
        .unwrap();
    indexer
        .process_block(&BlockStakeInput {
            height: 2,
            timestamp: Timestamp::new(10_600),
            additions: vec![stake_b],
            spends: vec![spend_b],
        })
        .unwrap();
    let snapshot = indexer.store().all_records().unwrap();

    let (spend_c, stake_c) = stake_creation(3, 2, &recipient, 300);
    let withdraw_a = CoinSpend::new(stake_a, Program::nil().to_bytes(), Program::nil().to_bytes());
    indexer
        .process_block(&BlockStakeInput {
            height: 3,
            timestamp: Timestamp::new(11_200),
            additions: vec![stake_c],
            spends: vec![spend_c, withdraw_a],
        })
        .unwrap();
    assert!(indexer.store().get_record(&stake_a.name()).unwrap().unwrap().is_spent());
    indexer
        .store()
        .records_for_puzzle_hash(&stake_a.puzzle_hash)
        .unwrap();

    indexer.rollback_to(2).unwrap();
    assert_eq!(indexer.store().all_records().unwrap(), snapshot);
    assert_eq!(indexer.store().cache_len(), (0, 0));
}

// ---------------------------------------------------------------------------
// 4. Replaying spend marking is harmless
// ---------------------------------------------------------------------------

#[test]
fn replayed_spends_do_not_change_ledger() {
    let (_dir, config) = temp_config();
    let env = open_environment(&config).unwrap();
    let indexer = indexer(&env, &config);

    let (spend, stake) = stake_creation(1, 0, &wallet(0x42), 100);
    indexer
        .process_block(&BlockStakeInput {
            height: 1,
            timestamp: Timestamp::new(10_000),
            additions: vec![stake],
            spends: vec![spend],
        })
        .unwrap();

    let withdraw = CoinSpend::new(stake, Program::nil().to_bytes(), Program::nil().to_bytes());
    let block = BlockStakeInput {
        height: 5,
        timestamp: Timestamp::new(20_000),
        additions: vec![],
        spends: vec![withdraw],
    };
    indexer.process_block(&block).unwrap();
    let once = indexer.store().all_records().unwrap();
    indexer.process_block(&block).unwrap();
    assert_eq!(indexer.store().all_records().unwrap(), once);
    assert_eq!(once[0].spent_index, 5);
}

// ---------------------------------------------------------------------------
// 5. Auto-withdraw cohort over the LMDB store
// ---------------------------------------------------------------------------

#[test]
fn auto_withdraw_picks_daily_cohort() {
    let (_dir, config) = temp_config();
    let env = open_environment(&config).unwrap();
    let indexer = indexer(&env, &config);
    let day = 86_400;

    let (spend, stake) = stake_creation(1, 0, &wallet(0x42), 100);
    indexer
        .process_block(&BlockStakeInput {
            height: 1,
            timestamp: Timestamp::new(3 * day + 1_500),
            additions: vec![stake],
            spends: vec![spend],
        })
        .unwrap();

    let scheduler = WithdrawScheduler::new(AutoWithdrawSettings {
        enabled: true,
        ..AutoWithdrawSettings::default()
    });
    let batches = scheduler
        .due_batches(
            indexer.store(),
            Timestamp::new(day + 1_000),
            Timestamp::new(day + 2_000),
        )
        .unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].coin_name, stake.name());
}

// ---------------------------------------------------------------------------
// 6. Reopening keeps the ledger
// ---------------------------------------------------------------------------

#[test]
fn ledger_survives_reopen() {
    let (_dir, config) = temp_config();
    let (spend, stake) = stake_creation(1, 4, &wallet(0x42), 100);
    {
        let env = open_environment(&config).unwrap();
        indexer(&env, &config)
            .process_block(&BlockStakeInput {
                height: 1,
                timestamp: Timestamp::new(10_000),
                additions: vec![stake],
                spends: vec![spend],
            })
            .unwrap();
    }
    let env = open_environment(&config).unwrap();
    let record = stake_store(&config, &env).get_record(&stake.name()).unwrap().unwrap();
    assert_eq!(record.stake_type, 4);
    assert_eq!(record.expiration, Timestamp::new(10_000 + 365 * 86_400));
}
