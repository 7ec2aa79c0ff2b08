#![no_main]

use libfuzzer_sys::fuzz_target;

use stakelock_protocol::StakeMetadata;

// Decoding arbitrary remark payloads must never panic, and anything that
// decodes must encode back to the same bytes.
fuzz_target!(|data: &[u8]| {
    if let Ok(metadata) = StakeMetadata::decode(data) {
        assert_eq!(metadata.encode(), data);
        assert!(metadata.tier().is_some());
    }
});
