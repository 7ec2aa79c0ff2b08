//! Conditions emitted by a puzzle.

use crate::{Program, ScriptError};

/// Condition opcodes this workspace reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionOpcode {
    /// Free-form annotation; ignored by consensus.
    Remark,
    AggSigMe,
    CreateCoin,
    AssertSecondsRelative,
    Unknown,
}

impl ConditionOpcode {
    pub const REMARK: u8 = 1;
    pub const AGG_SIG_ME: u8 = 50;
    pub const CREATE_COIN: u8 = 51;
    pub const ASSERT_SECONDS_RELATIVE: u8 = 80;

    pub fn from_atom(atom: &[u8]) -> Self {
        match atom {
            [Self::REMARK] => Self::Remark,
            [Self::AGG_SIG_ME] => Self::AggSigMe,
            [Self::CREATE_COIN] => Self::CreateCoin,
            [Self::ASSERT_SECONDS_RELATIVE] => Self::AssertSecondsRelative,
            _ => Self::Unknown,
        }
    }

    /// Opcode byte, `None` for [`ConditionOpcode::Unknown`].
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Remark => Some(Self::REMARK),
            Self::AggSigMe => Some(Self::AGG_SIG_ME),
            Self::CreateCoin => Some(Self::CREATE_COIN),
            Self::AssertSecondsRelative => Some(Self::ASSERT_SECONDS_RELATIVE),
            Self::Unknown => None,
        }
    }
}

/// A parsed condition: opcode plus its leading atom arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub opcode: ConditionOpcode,
    pub vars: Vec<Vec<u8>>,
}

impl Condition {
    /// `(ASSERT_SECONDS_RELATIVE seconds)` as a program.
    pub fn assert_seconds_relative(seconds: u64) -> Program {
        Program::list([
            Program::int(ConditionOpcode::ASSERT_SECONDS_RELATIVE as u64),
            Program::int(seconds),
        ])
    }

    /// `(CREATE_COIN puzzle_hash amount)` as a program.
    pub fn create_coin(puzzle_hash: &stakelock_types::PuzzleHash, amount: u64) -> Program {
        Program::list([
            Program::int(ConditionOpcode::CREATE_COIN as u64),
            Program::from(*puzzle_hash),
            Program::int(amount),
        ])
    }
}

/// Parse a puzzle's output list into conditions.
///
/// Arguments are collected up to the first non-atom (e.g. a memo list on
/// `CREATE_COIN`), which is not needed for classification.
pub fn parse_conditions(output: &Program) -> Result<Vec<Condition>, ScriptError> {
    let mut conditions = Vec::new();
    for item in output.iter_list() {
        let opcode_atom = item
            .first()
            .and_then(Program::as_atom)
            .ok_or_else(|| ScriptError::InvalidCondition(format!("{:?}", item)))?;
        let opcode = ConditionOpcode::from_atom(opcode_atom);

        let mut vars = Vec::new();
        if let Some(args) = item.rest() {
            for arg in args.iter_list() {
                match arg.as_atom() {
                    Some(atom) => vars.push(atom.to_vec()),
                    None => break,
                }
            }
        }
        conditions.push(Condition { opcode, vars });
    }
    Ok(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakelock_types::Bytes32;

    #[test]
    fn parses_create_coin_with_memos() {
        let ph = Bytes32::new([3; 32]);
        let cond = Program::list([
            Program::int(51),
            Program::from(ph),
            Program::int(1000),
            Program::list([Program::from(ph)]),
        ]);
        let parsed = parse_conditions(&Program::list([cond])).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].opcode, ConditionOpcode::CreateCoin);
        assert_eq!(parsed[0].vars, vec![ph.as_bytes().to_vec(), vec![0x03, 0xe8]]);
    }

    #[test]
    fn unknown_opcodes_are_kept() {
        let cond = Program::list([Program::int(99), Program::int(1)]);
        let parsed = parse_conditions(&Program::list([cond])).unwrap();
        assert_eq!(parsed[0].opcode, ConditionOpcode::Unknown);
    }

    #[test]
    fn atom_item_is_invalid() {
        let out = Program::list([Program::int(51)]);
        assert!(matches!(
            parse_conditions(&out),
            Err(ScriptError::InvalidCondition(_))
        ));
    }

    #[test]
    fn builders_match_codes() {
        let c = Condition::assert_seconds_relative(604_800);
        let parsed = parse_conditions(&Program::list([c])).unwrap();
        assert_eq!(parsed[0].opcode, ConditionOpcode::AssertSecondsRelative);
        assert_eq!(ConditionOpcode::CreateCoin.code(), Some(51));
    }
}
