//! Stake metadata carried in a `REMARK` condition.
//!
//! Wire form of the condition: `(REMARK STAKE_REMARK_TAG blob)` where
//!
//! ```text
//! blob = version: u8 || stake_type: u16 BE || recipient_puzzle_hash: [u8; 32]
//! ```

use serde::{Deserialize, Serialize};
use stakelock_script::{Condition, ConditionOpcode, Program};
use stakelock_types::{stake_tier, time_lock_for, Bytes32, PuzzleHash, StakeTier};
use thiserror::Error;

/// Remark tag distinguishing stake metadata from other remark payloads.
pub const STAKE_REMARK_TAG: u8 = 3;

pub const STAKE_METADATA_VERSION: u8 = 1;

/// Encoded length of a version 1 blob.
pub const STAKE_METADATA_LEN: usize = 1 + 2 + 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported stake metadata version {0}")]
    UnsupportedVersion(u8),

    #[error("stake metadata is {actual} bytes, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("stake metadata names unknown tier {0}")]
    UnknownTier(u16),
}

/// What a validator needs, besides the coin, to re-derive a lock puzzle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StakeMetadata {
    pub stake_type: u16,
    pub recipient_puzzle_hash: PuzzleHash,
}

impl StakeMetadata {
    pub fn new(stake_type: u16, recipient_puzzle_hash: PuzzleHash) -> Self {
        Self {
            stake_type,
            recipient_puzzle_hash,
        }
    }

    pub fn tier(&self) -> Option<&'static StakeTier> {
        stake_tier(self.stake_type)
    }

    /// Lock duration of the tier, 0 when the tier is unknown.
    pub fn time_lock(&self) -> u64 {
        time_lock_for(self.stake_type)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STAKE_METADATA_LEN);
        out.push(STAKE_METADATA_VERSION);
        out.extend_from_slice(&self.stake_type.to_be_bytes());
        out.extend_from_slice(self.recipient_puzzle_hash.as_bytes());
        out
    }

    pub fn decode(blob: &[u8]) -> Result<Self, CodecError> {
        let (&version, body) = blob.split_first().ok_or(CodecError::InvalidLength {
            expected: STAKE_METADATA_LEN,
            actual: 0,
        })?;
        if version != STAKE_METADATA_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        if blob.len() != STAKE_METADATA_LEN {
            return Err(CodecError::InvalidLength {
                expected: STAKE_METADATA_LEN,
                actual: blob.len(),
            });
        }

        let stake_type = u16::from_be_bytes([body[0], body[1]]);
        if stake_tier(stake_type).is_none() {
            return Err(CodecError::UnknownTier(stake_type));
        }
        let recipient_puzzle_hash = Bytes32::from_slice(&body[2..]).ok_or(CodecError::InvalidLength {
            expected: STAKE_METADATA_LEN,
            actual: blob.len(),
        })?;

        Ok(Self {
            stake_type,
            recipient_puzzle_hash,
        })
    }

    /// `(REMARK STAKE_REMARK_TAG blob)`
    pub fn to_remark_condition(&self) -> Program {
        Program::list([
            Program::int(ConditionOpcode::REMARK as u64),
            Program::int(STAKE_REMARK_TAG as u64),
            Program::atom(self.encode()),
        ])
    }

    /// Decode the payload of a stake remark.
    ///
    /// `None` when the condition is not a stake remark at all; the inner
    /// result reports whether the payload was well formed.
    pub fn from_condition(condition: &Condition) -> Option<Result<Self, CodecError>> {
        if !is_stake_remark(condition) {
            return None;
        }
        Some(Self::decode(&condition.vars[1]))
    }
}

/// A `REMARK` with exactly two arguments whose tag is [`STAKE_REMARK_TAG`].
pub fn is_stake_remark(condition: &Condition) -> bool {
    condition.opcode == ConditionOpcode::Remark
        && condition.vars.len() == 2
        && tag_value(&condition.vars[0]) == Some(STAKE_REMARK_TAG as u64)
}

/// Unsigned big-endian value of a tag atom.
fn tag_value(atom: &[u8]) -> Option<u64> {
    let significant: Vec<u8> = atom.iter().copied().skip_while(|&b| b == 0).collect();
    if significant.len() > 8 {
        return None;
    }
    Some(significant.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}
