//! Stake ledger schema versions.
//!
//! The meta database holds the layout version of the stake table and its
//! indexes. Opening a ledger upgrades an older layout step by step and
//! refuses one written by a newer build.

use stakelock_store::MetaStore;

use crate::LmdbError;

/// Layout written by this build: bincode stake rows keyed by coin id, plus
/// the confirmed, spent, type, holder and expiration indexes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub struct Migrator;

impl Migrator {
    /// Bring the ledger behind `meta_store` to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// An unstamped ledger reads as version 0 and is stamped. Returns the
    /// version found before any upgrade.
    pub fn run(meta_store: &impl MetaStore) -> Result<u32, LmdbError> {
        let found = meta_store
            .get_schema_version()
            .map_err(|e| LmdbError::Schema(e.to_string()))?;

        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Schema(format!(
                "ledger schema {} is newer than {} supported here",
                found, CURRENT_SCHEMA_VERSION
            )));
        }
        if found == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = found, "stake ledger schema current");
            return Ok(found);
        }

        for from in found..CURRENT_SCHEMA_VERSION {
            upgrade_from(from)?;
            tracing::info!(from, to = from + 1, "upgraded stake ledger schema");
        }
        meta_store
            .set_schema_version(CURRENT_SCHEMA_VERSION)
            .map_err(|e| LmdbError::Schema(e.to_string()))?;
        Ok(found)
    }
}

/// One upgrade step, `from` to `from + 1`.
fn upgrade_from(from: u32) -> Result<(), LmdbError> {
    match from {
        // `open` already created every database; an empty ledger only needs
        // the stamp.
        0 => Ok(()),
        _ => Err(LmdbError::Schema(format!("no upgrade from schema {}", from))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn missing_step_is_error() {
        assert!(matches!(upgrade_from(99), Err(LmdbError::Schema(_))));
    }

    #[test]
    fn fresh_ledger_is_stamped_once() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
        let meta = env.meta_store();
        assert_eq!(Migrator::run(&meta).unwrap(), 0);
        assert_eq!(meta.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(Migrator::run(&meta).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 20).unwrap();
        let meta = env.meta_store();
        meta.set_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(Migrator::run(&meta), Err(LmdbError::Schema(_))));
        assert_eq!(meta.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION + 1);
    }
}
