#![no_main]

use libfuzzer_sys::fuzz_target;

use stakelock_store::StakeRecord;

// Stake rows are read back from disk with bincode; a corrupted row must
// surface as an error, never a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(record) = bincode::deserialize::<StakeRecord>(data) {
        let _ = record.weighted_amount_scaled();
        let _ = record.is_spent();
    }
});
