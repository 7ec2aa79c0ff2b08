use proptest::prelude::*;

use stakelock_nullables::NullEvaluator;
use stakelock_protocol::{
    build_unlock_solution, derive_lock_script_hash, lock_script, make_delegated_solution,
    match_from_spend, Payment, ProtocolError, StakeMetadata,
};
use stakelock_script::templates::P2_DELEGATED_MOD;
use stakelock_script::{
    conditions_for_solution, curry, ConditionOpcode, Program, MAX_CONDITIONS_COST,
};
use stakelock_types::{time_lock_for, Bytes32, Coin, CoinSpend, STAKE_TIERS};

fn wallet(key: u8) -> Program {
    curry(&P2_DELEGATED_MOD, &[Program::atom(vec![key; 48])])
}

fn stake_creation(metadata: &StakeMetadata, destination: Bytes32, amount: u64) -> CoinSpend {
    let puzzle = wallet(0xaa);
    let solution = make_delegated_solution(
        &[Payment::new(destination, amount)],
        vec![metadata.to_remark_condition()],
    );
    let coin = Coin::new(Bytes32::new([1; 32]), puzzle.tree_hash(), amount);
    CoinSpend::new(coin, puzzle.to_bytes(), solution.to_bytes())
}

fn tier() -> impl Strategy<Value = u16> {
    0..STAKE_TIERS.len() as u16
}

proptest! {
    /// A stake created for a tier and recipient is recognised with exactly that metadata.
    #[test]
    fn creation_round_trip(stake_type in tier(), key in any::<u8>(), amount in 1u64..u64::MAX) {
        let recipient = wallet(key).tree_hash();
        let metadata = StakeMetadata::new(stake_type, recipient);
        let lock = derive_lock_script_hash(time_lock_for(stake_type), &recipient).unwrap();
        prop_assert_eq!(lock_script(time_lock_for(stake_type), &recipient).unwrap().tree_hash(), lock);

        let spend = stake_creation(&metadata, lock, amount);
        let (found, lock_hash) = match_from_spend(&spend, &NullEvaluator::new()).unwrap();
        prop_assert_eq!(found, Some(metadata));
        prop_assert_eq!(lock_hash, Some(lock));
    }

    /// Metadata claiming a different tier than the coin was locked for is dropped.
    #[test]
    fn forged_tier_is_rejected(actual in tier(), claimed in tier(), key in any::<u8>()) {
        prop_assume!(actual != claimed);
        let recipient = wallet(key).tree_hash();
        let lock = derive_lock_script_hash(time_lock_for(actual), &recipient).unwrap();
        let spend = stake_creation(&StakeMetadata::new(claimed, recipient), lock, 1_000);
        prop_assert_eq!(match_from_spend(&spend, &NullEvaluator::new()).unwrap(), (None, None));
    }

    /// Metadata naming another recipient than the lock commits to is dropped.
    #[test]
    fn forged_recipient_is_rejected(stake_type in tier(), a in any::<u8>(), b in any::<u8>()) {
        prop_assume!(a != b);
        let lock = derive_lock_script_hash(time_lock_for(stake_type), &wallet(a).tree_hash()).unwrap();
        let forged = StakeMetadata::new(stake_type, wallet(b).tree_hash());
        let spend = stake_creation(&forged, lock, 1_000);
        prop_assert_eq!(match_from_spend(&spend, &NullEvaluator::new()).unwrap(), (None, None));
    }

    /// Only the committed recipient puzzle can build an unlock solution.
    #[test]
    fn unlock_needs_recipient(stake_type in tier(), owner in any::<u8>(), thief in any::<u8>()) {
        prop_assume!(owner != thief);
        let recipient = wallet(owner).tree_hash();
        let time_lock = time_lock_for(stake_type);
        let err = build_unlock_solution(time_lock, &recipient, &wallet(thief), &Program::nil())
            .unwrap_err();
        let is_unauthorized = matches!(err, ProtocolError::UnauthorizedUnlock { .. });
        prop_assert!(is_unauthorized);
    }

    /// The recipient's unlock asserts the tier's full lock age first.
    #[test]
    fn unlock_asserts_time_lock(stake_type in tier(), owner in any::<u8>()) {
        let inner = wallet(owner);
        let recipient = inner.tree_hash();
        let time_lock = time_lock_for(stake_type);
        let inner_solution = make_delegated_solution(&[Payment::new(Bytes32::new([9; 32]), 5)], vec![]);
        let solution = build_unlock_solution(time_lock, &recipient, &inner, &inner_solution).unwrap();
        let puzzle = lock_script(time_lock, &recipient).unwrap();

        let conds = conditions_for_solution(&NullEvaluator::new(), &puzzle, &solution, MAX_CONDITIONS_COST)
            .unwrap();
        prop_assert_eq!(conds[0].opcode, ConditionOpcode::AssertSecondsRelative);
        prop_assert_eq!(Program::atom(conds[0].vars[0].clone()).as_u64(), Some(time_lock));
    }
}
