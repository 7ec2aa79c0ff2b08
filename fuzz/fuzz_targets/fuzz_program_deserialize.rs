#![no_main]

use libfuzzer_sys::fuzz_target;

use stakelock_script::{parse_conditions, uncurry, Program};

// Untrusted puzzle reveals and solutions go through these paths first.
fuzz_target!(|data: &[u8]| {
    let Ok(program) = Program::from_bytes(data) else {
        return;
    };
    let reserialized = program.to_bytes();
    let again = Program::from_bytes(&reserialized).expect("reserialized program parses");
    assert_eq!(again.tree_hash(), program.tree_hash());

    let _ = uncurry(&program);
    let _ = parse_conditions(&program);
});
