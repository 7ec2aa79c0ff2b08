//! Nullable script evaluator: runs the small operator set the stake templates use.

use stakelock_crypto::sha256_multi;
use stakelock_script::{Program, ScriptError, ScriptEvaluator};

/// A deterministic evaluator for testing.
///
/// Understands quote, apply, if, cons, first, rest, listp, raise, `=`,
/// sha256, lsh and logand: enough to run the stake templates and ordinary
/// `(q . conditions)` delegated puzzles. Every operation costs one unit.
pub struct NullEvaluator {
    failure: Option<String>,
}

impl NullEvaluator {
    pub fn new() -> Self {
        Self { failure: None }
    }

    /// An evaluator that rejects every program.
    pub fn failing() -> Self {
        Self {
            failure: Some("evaluator unavailable".to_string()),
        }
    }
}

impl Default for NullEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEvaluator for NullEvaluator {
    fn run(
        &self,
        program: &Program,
        solution: &Program,
        max_cost: u64,
    ) -> Result<Program, ScriptError> {
        if let Some(reason) = &self.failure {
            return Err(ScriptError::Evaluation(reason.clone()));
        }
        let mut run = Run {
            remaining: max_cost,
            limit: max_cost,
        };
        run.eval(program, solution)
    }
}

struct Run {
    remaining: u64,
    limit: u64,
}

impl Run {
    fn eval(&mut self, program: &Program, env: &Program) -> Result<Program, ScriptError> {
        self.remaining = self
            .remaining
            .checked_sub(1)
            .ok_or(ScriptError::CostExceeded { limit: self.limit })?;

        let (op, operands) = match program {
            Program::Atom(path) => return traverse(path, env),
            Program::Pair(op, operands) => (op, operands),
        };
        let op = op
            .as_atom()
            .ok_or_else(|| fail("operator is not an atom"))?;
        if op == [1] {
            return Ok((**operands).clone());
        }

        let mut args = Vec::new();
        for operand in operands.iter_list() {
            args.push(self.eval(operand, env)?);
        }

        match op {
            [2] => {
                let [f, e] = take::<2>(args)?;
                self.eval(&f, &e)
            }
            [3] => {
                let [cond, then, otherwise] = take::<3>(args)?;
                Ok(if cond.is_nil() { otherwise } else { then })
            }
            [4] => {
                let [first, rest] = take::<2>(args)?;
                Ok(Program::pair(first, rest))
            }
            [5] => {
                let [p] = take::<1>(args)?;
                p.first().cloned().ok_or_else(|| fail("first of atom"))
            }
            [6] => {
                let [p] = take::<1>(args)?;
                p.rest().cloned().ok_or_else(|| fail("rest of atom"))
            }
            [7] => {
                let [p] = take::<1>(args)?;
                Ok(boolean(p.is_pair()))
            }
            [8] => Err(fail("clvm raise")),
            [9] => {
                let [a, b] = take::<2>(args)?;
                Ok(boolean(atom(&a)? == atom(&b)?))
            }
            [11] => {
                let parts = args.iter().map(atom).collect::<Result<Vec<_>, _>>()?;
                Ok(Program::atom(sha256_multi(&parts).to_vec()))
            }
            [23] => {
                let [value, shift] = take::<2>(args)?;
                let value = to_unsigned(atom(&value)?)?;
                let shift = to_signed(atom(&shift)?)?;
                let shifted = if shift >= 0 {
                    value.checked_shl(shift as u32).unwrap_or(0)
                } else {
                    value.checked_shr(shift.unsigned_abs() as u32).unwrap_or(0)
                };
                Ok(Program::atom(signed_bytes(shifted as i128)))
            }
            [24] => {
                let mut acc: i64 = -1;
                for arg in &args {
                    acc &= to_signed(atom(arg)?)?;
                }
                Ok(Program::atom(signed_bytes(acc as i128)))
            }
            other => Err(fail(&format!("unsupported operator 0x{}", hex(other)))),
        }
    }
}

fn traverse(path: &[u8], env: &Program) -> Result<Program, ScriptError> {
    let mut bits = to_unsigned(path)?;
    if bits == 0 {
        return Ok(Program::nil());
    }
    let mut node = env;
    while bits > 1 {
        node = match node {
            Program::Pair(first, rest) => {
                if bits & 1 == 0 {
                    first
                } else {
                    rest
                }
            }
            Program::Atom(_) => return Err(fail("path into atom")),
        };
        bits >>= 1;
    }
    Ok(node.clone())
}

fn take<const N: usize>(args: Vec<Program>) -> Result<[Program; N], ScriptError> {
    let count = args.len();
    args.try_into()
        .map_err(|_| fail(&format!("expected {} arguments, got {}", N, count)))
}

fn atom(p: &Program) -> Result<&[u8], ScriptError> {
    p.as_atom().ok_or_else(|| fail("expected an atom"))
}

fn boolean(value: bool) -> Program {
    if value {
        Program::int(1)
    } else {
        Program::nil()
    }
}

fn to_unsigned(bytes: &[u8]) -> Result<u64, ScriptError> {
    let significant: Vec<u8> = bytes.iter().copied().skip_while(|&b| b == 0).collect();
    if significant.len() > 8 {
        return Err(fail("integer too large"));
    }
    Ok(significant.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

fn to_signed(bytes: &[u8]) -> Result<i64, ScriptError> {
    if bytes.len() > 8 {
        return Err(fail("integer too large"));
    }
    let Some(&head) = bytes.first() else {
        return Ok(0);
    };
    let fill = if head & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    Ok(i64::from_be_bytes(buf))
}

/// Minimal two's-complement big-endian encoding.
fn signed_bytes(value: i128) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let raw = value.to_be_bytes();
    let mut start = 0;
    while start < raw.len() - 1 {
        let redundant = (raw[start] == 0x00 && raw[start + 1] & 0x80 == 0)
            || (raw[start] == 0xff && raw[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    raw[start..].to_vec()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn fail(msg: &str) -> ScriptError {
    ScriptError::Evaluation(msg.to_string())
}
