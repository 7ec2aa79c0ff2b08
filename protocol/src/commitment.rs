//! Lock puzzle derivation, unlock solutions and stake recognition.
//!
//! A stake coin's puzzle is `P2_1_OF_N` curried with the root of a one-leaf
//! commitment tree. The leaf is `AUGMENTED_CONDITION` curried with
//! `(ASSERT_SECONDS_RELATIVE time_lock)` and the recipient's puzzle, so only
//! the recipient can spend, and only once the coin is `time_lock` seconds old.
//!
//! Creation and verification both go through [`derive_lock_script_hash`].

use std::collections::HashSet;

use stakelock_crypto::CommitmentTree;
use stakelock_script::program::hash_atom;
use stakelock_script::templates::{
    merkle_proof_program, AUGMENTED_CONDITION_MOD, AUGMENTED_CONDITION_MOD_HASH, P2_1_OF_N_MOD,
    P2_1_OF_N_MOD_HASH, P2_DELEGATED_MOD,
};
use stakelock_script::{
    conditions_for_solution, curried_tree_hash, curry, uncurry, Condition, ConditionOpcode,
    Program, ScriptEvaluator, Uncurried, MAX_CONDITIONS_COST,
};
use stakelock_types::{Bytes32, Coin, CoinSpend, PuzzleHash};
use tracing::{debug, error, warn};

use crate::{ProtocolError, StakeMetadata};

/// Puzzle hash a stake for `(time_lock, recipient)` must be sent to.
pub fn derive_lock_script_hash(
    time_lock: u64,
    recipient_puzzle_hash: &PuzzleHash,
) -> Result<PuzzleHash, ProtocolError> {
    let tree = commitment_tree(time_lock, recipient_puzzle_hash)?;
    Ok(curried_tree_hash(
        &P2_1_OF_N_MOD_HASH,
        &[hash_atom(tree.root().as_bytes())],
    ))
}

/// The full lock puzzle; its tree hash equals [`derive_lock_script_hash`].
pub fn lock_script(
    time_lock: u64,
    recipient_puzzle_hash: &PuzzleHash,
) -> Result<Program, ProtocolError> {
    let tree = commitment_tree(time_lock, recipient_puzzle_hash)?;
    Ok(curry(&P2_1_OF_N_MOD, &[Program::from(tree.root())]))
}

/// Solution letting the recipient spend a stake coin.
///
/// `inner_script` must hash to `recipient_puzzle_hash`; it is the only
/// unlocking path. The result is `(proof augmented_script (inner_solution))`.
pub fn build_unlock_solution(
    time_lock: u64,
    recipient_puzzle_hash: &PuzzleHash,
    inner_script: &Program,
    inner_solution: &Program,
) -> Result<Program, ProtocolError> {
    let inner_hash = inner_script.tree_hash();
    if inner_hash != *recipient_puzzle_hash {
        return Err(ProtocolError::UnauthorizedUnlock {
            expected: *recipient_puzzle_hash,
            actual: inner_hash,
        });
    }

    let tree = commitment_tree(time_lock, recipient_puzzle_hash)?;
    let augmented = curry(
        &AUGMENTED_CONDITION_MOD,
        &[
            Condition::assert_seconds_relative(time_lock),
            inner_script.clone(),
        ],
    );
    let proof = tree.proof(&augmented.tree_hash()).ok_or_else(|| {
        ProtocolError::InvalidParameter("augmented puzzle is not committed to".to_string())
    })?;

    Ok(Program::list([
        merkle_proof_program(&proof),
        augmented,
        Program::list([inner_solution.clone()]),
    ]))
}

/// Run a candidate stake-creating spend and collect what it declares.
///
/// Returns the decoded stake metadata (if a stake remark is present) and the
/// puzzle hashes of every coin the spend creates. A puzzle that is not the
/// ordinary payment template yields `(None, ∅)`, as does a malformed stake
/// remark.
pub fn extract_metadata_and_outputs<E: ScriptEvaluator + ?Sized>(
    uncurried: &Uncurried,
    inner_script: &Program,
    inner_solution: &Program,
    evaluator: &E,
) -> Result<(Option<StakeMetadata>, HashSet<PuzzleHash>), ProtocolError> {
    if uncurried.module != *P2_DELEGATED_MOD {
        return Ok((None, HashSet::new()));
    }

    let conditions =
        conditions_for_solution(evaluator, inner_script, inner_solution, MAX_CONDITIONS_COST)?;

    let mut metadata = None;
    let mut created = HashSet::new();
    for condition in &conditions {
        match condition.opcode {
            ConditionOpcode::Remark => match StakeMetadata::from_condition(condition) {
                Some(Ok(decoded)) => metadata = Some(decoded),
                Some(Err(err)) => {
                    error!(
                        blob = %hex::encode(&condition.vars[1]),
                        %err,
                        "invalid stake metadata"
                    );
                    return Ok((None, HashSet::new()));
                }
                None => {}
            },
            ConditionOpcode::CreateCoin => {
                if let Some(puzzle_hash) = condition.vars.first().and_then(|v| Bytes32::from_slice(v)) {
                    created.insert(puzzle_hash);
                }
            }
            _ => {}
        }
    }
    Ok((metadata, created))
}

/// Stake metadata of a spend, if it both declares a stake and creates the
/// coin that declaration commits to.
///
/// A declaration whose lock puzzle hash is not among the created coins is a
/// forgery attempt or a wallet bug; it is logged and yields `None`.
pub fn match_and_validate<E: ScriptEvaluator + ?Sized>(
    uncurried: &Uncurried,
    inner_script: &Program,
    inner_solution: &Program,
    evaluator: &E,
) -> Result<Option<StakeMetadata>, ProtocolError> {
    let (metadata, created) =
        extract_metadata_and_outputs(uncurried, inner_script, inner_solution, evaluator)?;
    Ok(metadata.filter(|m| validated_lock_hash(m, &created).is_some()))
}

/// [`match_and_validate`] over a serialized coin spend.
///
/// Also returns the validated lock puzzle hash so the caller can find the
/// stake coin among the block's additions.
pub fn match_from_spend<E: ScriptEvaluator + ?Sized>(
    coin_spend: &CoinSpend,
    evaluator: &E,
) -> Result<(Option<StakeMetadata>, Option<PuzzleHash>), ProtocolError> {
    let puzzle = Program::from_bytes(&coin_spend.puzzle_reveal)?;
    let solution = Program::from_bytes(&coin_spend.solution)?;
    let Some(uncurried) = uncurry(&puzzle) else {
        return Ok((None, None));
    };

    let (metadata, created) =
        extract_metadata_and_outputs(&uncurried, &puzzle, &solution, evaluator)?;
    let Some(metadata) = metadata else {
        return Ok((None, None));
    };
    match validated_lock_hash(&metadata, &created) {
        Some(lock_hash) => {
            debug!(coin = %coin_spend.coin.name(), %lock_hash, stake_type = metadata.stake_type, "stake creation");
            Ok((Some(metadata), Some(lock_hash)))
        }
        None => Ok((None, None)),
    }
}

/// Spend of a stake coin by its recipient.
///
/// Fails with [`ProtocolError::PuzzleHashMismatch`] when `metadata` does not
/// describe `coin`.
pub fn generate_stake_spend(
    coin: &Coin,
    metadata: &StakeMetadata,
    inner_script: &Program,
    inner_solution: &Program,
) -> Result<CoinSpend, ProtocolError> {
    let time_lock = metadata.time_lock();
    let puzzle = lock_script(time_lock, &metadata.recipient_puzzle_hash)?;
    let expected = puzzle.tree_hash();
    if expected != coin.puzzle_hash {
        return Err(ProtocolError::PuzzleHashMismatch {
            coin: coin.name(),
            expected,
            actual: coin.puzzle_hash,
        });
    }

    let solution = build_unlock_solution(
        time_lock,
        &metadata.recipient_puzzle_hash,
        inner_script,
        inner_solution,
    )?;
    Ok(CoinSpend::new(*coin, puzzle.to_bytes(), solution.to_bytes()))
}

fn commitment_tree(
    time_lock: u64,
    recipient_puzzle_hash: &PuzzleHash,
) -> Result<CommitmentTree, ProtocolError> {
    if time_lock < 1 {
        return Err(ProtocolError::InvalidParameter(
            "time lock must be at least 1 second".to_string(),
        ));
    }
    let condition_hash = Condition::assert_seconds_relative(time_lock).tree_hash();
    let leaf = curried_tree_hash(
        &AUGMENTED_CONDITION_MOD_HASH,
        &[condition_hash, *recipient_puzzle_hash],
    );
    Ok(CommitmentTree::new(vec![leaf])?)
}

fn validated_lock_hash(
    metadata: &StakeMetadata,
    created: &HashSet<PuzzleHash>,
) -> Option<PuzzleHash> {
    let lock_hash =
        match derive_lock_script_hash(metadata.time_lock(), &metadata.recipient_puzzle_hash) {
            Ok(hash) => hash,
            Err(err) => {
                warn!(?metadata, %err, "stake metadata does not derive a lock puzzle");
                return None;
            }
        };
    if !created.contains(&lock_hash) {
        error!(?metadata, %lock_hash, "stake metadata does not match any created coin");
        return None;
    }
    Some(lock_hash)
}
