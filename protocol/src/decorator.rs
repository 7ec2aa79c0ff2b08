//! Wallet-side puzzle decorator that turns an ordinary payment into a stake.
//!
//! The decorator leaves the wallet's own puzzle alone. It redirects the
//! single payment of a spend to the lock puzzle hash and adds the stake
//! remark to the delegated conditions, so validators can recognise the
//! creation and re-derive the lock.

use serde::{Deserialize, Serialize};
use stakelock_script::{Condition, ConditionOpcode, Program};
use stakelock_types::{time_lock_for, Bytes32, PuzzleHash, DEFAULT_STAKE_TYPE};
use tracing::debug;

use crate::{derive_lock_script_hash, ProtocolError, StakeMetadata};

/// Wallet configuration for the stake decorator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorConfig {
    #[serde(default = "default_stake_type")]
    pub stake_type: u16,
    pub recipient_ph: PuzzleHash,
}

fn default_stake_type() -> u16 {
    DEFAULT_STAKE_TYPE
}

/// One coin to create: `(CREATE_COIN puzzle_hash amount memos?)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub puzzle_hash: PuzzleHash,
    pub amount: u64,
    pub memos: Vec<Vec<u8>>,
}

impl Payment {
    pub fn new(puzzle_hash: PuzzleHash, amount: u64) -> Self {
        Self {
            puzzle_hash,
            amount,
            memos: Vec::new(),
        }
    }

    pub fn with_memos(mut self, memos: Vec<Vec<u8>>) -> Self {
        self.memos = memos;
        self
    }

    pub fn to_condition(&self) -> Program {
        if self.memos.is_empty() {
            return Condition::create_coin(&self.puzzle_hash, self.amount);
        }
        Program::list([
            Program::int(ConditionOpcode::CREATE_COIN as u64),
            Program::from(self.puzzle_hash),
            Program::int(self.amount),
            Program::list(self.memos.iter().cloned().map(Program::atom)),
        ])
    }
}

/// Solution for the delegated payment puzzle: `((q . conditions) ())`.
///
/// Payments come first, followed by `extra` conditions in order.
pub fn make_delegated_solution(primaries: &[Payment], extra: Vec<Program>) -> Program {
    let conditions = primaries
        .iter()
        .map(Payment::to_condition)
        .chain(extra)
        .collect::<Vec<_>>();
    Program::list([Program::list(conditions).quote(), Program::nil()])
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePuzzleDecorator {
    pub stake_type: u16,
    pub recipient_puzzle_hash: PuzzleHash,
}

impl StakePuzzleDecorator {
    pub fn new(stake_type: u16, recipient_puzzle_hash: PuzzleHash) -> Self {
        Self {
            stake_type,
            recipient_puzzle_hash,
        }
    }

    pub fn from_config(config: &DecoratorConfig) -> Self {
        Self::new(config.stake_type, config.recipient_ph)
    }

    pub fn metadata(&self) -> StakeMetadata {
        StakeMetadata::new(self.stake_type, self.recipient_puzzle_hash)
    }

    /// The wallet's puzzle is not wrapped.
    pub fn decorate(&self, inner: Program) -> Program {
        inner
    }

    /// Replace a payment target with the lock puzzle hash of this tier and
    /// recipient. Fails for a tier outside the table.
    pub fn decorate_target_puzzle_hash(
        &self,
        inner: Program,
        _target: &Bytes32,
    ) -> Result<(Program, PuzzleHash), ProtocolError> {
        let lock_hash =
            derive_lock_script_hash(time_lock_for(self.stake_type), &self.recipient_puzzle_hash)?;
        Ok((inner, lock_hash))
    }

    /// Add the stake remark to a single-payment delegated solution.
    ///
    /// `inner_solution` must be `((q . conditions) delegated_solution)`;
    /// the remark is placed in front of `conditions`. With zero or several
    /// primaries the solution is returned unchanged.
    pub fn solve(
        &self,
        inner: Program,
        primaries: &[Payment],
        inner_solution: Program,
    ) -> Result<(Program, Program), ProtocolError> {
        if primaries.len() != 1 {
            return Ok((inner, inner_solution));
        }

        let malformed =
            || ProtocolError::InvalidParameter("solution is not ((q . conditions) ...)".to_string());
        let (delegated, rest) = match &inner_solution {
            Program::Pair(first, rest) => (first.as_ref(), rest.as_ref().clone()),
            Program::Atom(_) => return Err(malformed()),
        };
        let conditions = match delegated {
            Program::Pair(op, conditions) if op.as_atom() == Some(&[1u8][..]) => {
                conditions.as_ref().clone()
            }
            _ => return Err(malformed()),
        };

        debug!(
            stake_type = self.stake_type,
            recipient = %self.recipient_puzzle_hash,
            "adding stake remark"
        );
        let delegated = conditions.cons(self.metadata().to_remark_condition()).quote();
        Ok((inner, Program::pair(delegated, rest)))
    }

    /// Prepend the original target to the memo list so the recipient can be
    /// found from the created coin.
    pub fn decorate_memos(
        &self,
        inner: Program,
        target: &Bytes32,
        mut memos: Vec<Vec<u8>>,
    ) -> (Program, Vec<Vec<u8>>) {
        memos.insert(0, target.as_bytes().to_vec());
        (inner, memos)
    }
}
