//! stakectl: inspect and maintain a stake ledger.
//!
//! Read-only queries over the LMDB ledger plus the two maintenance actions a
//! node operator needs (rollback after a reorg, integrity check). It never
//! builds or submits transactions.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use stakelock_node::{open_environment, stake_store, NodeConfig};
use stakelock_store::{MetaStore, StakeRecord, StakeStore};
use stakelock_store_lmdb::{check_integrity, CURRENT_SCHEMA_VERSION};
use stakelock_types::{PuzzleHash, Timestamp, STAKE_TIERS};
use stakelock_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "stakectl", about = "Stake ledger inspection and maintenance")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and env vars override them.
    #[arg(long, env = "STAKELOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the LMDB environment.
    #[arg(long, env = "STAKELOCK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "STAKELOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "STAKELOCK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Print records as JSON lines instead of a table.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// List the stake tiers.
    Tiers,
    /// Active stake totals at a Unix time (defaults to now).
    Total {
        #[arg(long)]
        at: Option<u64>,
    },
    /// Stakes confirmed at a block height.
    Confirmed {
        #[arg(long)]
        height: u32,
    },
    /// Auto-withdraw cohort for a check window.
    Cohort {
        #[arg(long)]
        start: u64,
        #[arg(long)]
        end: u64,
    },
    /// Stakes locked to a puzzle hash (hex).
    Holder { puzzle_hash: PuzzleHash },
    /// Undo every block above a height; a negative height empties the ledger.
    Rollback {
        #[arg(long, allow_negative_numbers = true)]
        height: i64,
    },
    /// Verify database structure and schema version.
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Tiers => {
            print_tiers();
            Ok(())
        }
        command => run_ledger_command(command, &config, cli.json),
    }
}

fn run_ledger_command(command: Command, config: &NodeConfig, json: bool) -> anyhow::Result<()> {
    let env = open_environment(config)
        .with_context(|| format!("opening ledger at {}", config.data_dir.display()))?;
    let store = stake_store(config, &env);

    match command {
        Command::Tiers => print_tiers(),
        Command::Total { at } => {
            let at = at.map(Timestamp::new).unwrap_or_else(Timestamp::now);
            let totals = store.total_active_stake(at)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "at": at.as_secs(),
                        "amount": totals.amount.to_string(),
                        "weighted": totals.weighted(),
                    })
                );
            } else {
                println!("at        {}", at.as_secs());
                println!("amount    {}", totals.amount);
                println!("weighted  {:.4}", totals.weighted());
            }
        }
        Command::Confirmed { height } => {
            print_records(&store.records_confirmed_at(height)?, json)?;
        }
        Command::Cohort { start, end } => {
            if end < start {
                bail!("window end {} is before start {}", end, start);
            }
            let records = store.range_by_expiry_bucket(Timestamp::new(start), Timestamp::new(end))?;
            print_records(&records, json)?;
        }
        Command::Holder { puzzle_hash } => {
            print_records(&store.records_for_puzzle_hash(&puzzle_hash)?, json)?;
        }
        Command::Rollback { height } => {
            let before = store.record_count()?;
            store.rollback_to(height)?;
            let removed = before.saturating_sub(store.record_count()?);
            tracing::info!(height, removed, "rollback complete");
            println!("rolled back to {}: {} records removed", height, removed);
        }
        Command::Check => {
            let report = check_integrity(&env)?;
            let schema = env.meta_store().get_schema_version()?;
            println!(
                "databases {}  entries {}  stakes {}  schema {}/{}",
                report.databases_checked,
                report.total_entries,
                report.stake_records,
                schema,
                CURRENT_SCHEMA_VERSION
            );
            for error in &report.errors {
                println!("error: {}", error);
            }
            if !report.is_healthy() {
                bail!("{} integrity errors", report.errors.len());
            }
        }
    }
    Ok(())
}

fn print_tiers() {
    println!("{:>4}  {:>12}  {:>10}", "type", "lock", "coefficient");
    for (index, tier) in STAKE_TIERS.iter().enumerate() {
        println!(
            "{:>4}  {:>12}  {:>10}",
            index,
            format_duration(tier.time_lock),
            tier.coefficient
        );
    }
}

fn print_records(records: &[StakeRecord], json: bool) -> anyhow::Result<()> {
    if json {
        for record in records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }
    for r in records {
        println!(
            "{}  {:>20}  weighted {:>20}  type {:>2}  confirmed {:>9}  spent {:>9}  expires {}",
            r.coin_name,
            r.amount,
            r.weighted_amount(),
            r.stake_type,
            r.confirmed_index,
            r.spent_index,
            r.expiration
        );
    }
    println!("{} records", records.len());
    Ok(())
}
