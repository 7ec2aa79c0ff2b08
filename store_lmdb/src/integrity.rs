//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the node begins
//! ingesting blocks.

use std::path::Path;

use heed::types::Bytes;
use heed::RoTxn;
use stakelock_store::StakeRecord;

use crate::environment::{StakeDatabases, DATABASE_NAMES};
use crate::keys::{coin_suffix, height_key};
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub stake_records: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check LMDB database integrity on startup.
///
/// Counts every named database, then decodes each stake row and checks it
/// against its index entries. Problems are recorded in the report rather
/// than returned as errors.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env.env().open_database::<Bytes, Bytes>(&rtxn, Some(db_name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    check_stake_rows(&env.stake, &rtxn, &mut report)?;
    Ok(report)
}

fn check_stake_rows(
    dbs: &StakeDatabases,
    rtxn: &RoTxn<'_>,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    let mut spent = 0u64;
    for entry in dbs.records.iter(rtxn)? {
        let (key, value) = entry?;
        report.stake_records += 1;
        let record: StakeRecord = match bincode::deserialize(value) {
            Ok(record) => record,
            Err(e) => {
                report
                    .errors
                    .push(format!("undecodable stake row {}: {}", hex_prefix(key), e));
                continue;
            }
        };
        if coin_suffix(key) != Some(record.coin_name) {
            report
                .errors
                .push(format!("stake row key does not match coin {}", record.coin_name));
        }
        if record.is_spent() {
            spent += 1;
            if record.spent_index <= record.confirmed_index {
                report.errors.push(format!(
                    "coin {} spent at {} but confirmed at {}",
                    record.coin_name, record.spent_index, record.confirmed_index
                ));
            }
            let key = height_key(record.spent_index, &record.coin_name);
            if dbs.spent.get(rtxn, &key)?.is_none() {
                report
                    .errors
                    .push(format!("coin {} missing from spent index", record.coin_name));
            }
        }
        let key = height_key(record.confirmed_index, &record.coin_name);
        if dbs.confirmed.get(rtxn, &key)?.is_none() {
            report
                .errors
                .push(format!("coin {} missing from confirmed index", record.coin_name));
        }
    }

    let rows = report.stake_records;
    for (name, db, expected) in [
        ("stake_confirmed", dbs.confirmed, rows),
        ("stake_type", dbs.stake_type, rows),
        ("stake_puzzle_hash", dbs.puzzle_hash, rows),
        ("stake_expiration", dbs.expiration, rows),
        ("stake_spent", dbs.spent, spent),
    ] {
        let count = db.len(rtxn)?;
        if count != expected {
            report.errors.push(format!(
                "index '{}' has {} entries, expected {}",
                name, count, expected
            ));
        }
    }
    Ok(())
}

fn hex_prefix(key: &[u8]) -> String {
    key.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
