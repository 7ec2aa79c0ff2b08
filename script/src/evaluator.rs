//! Seam to an external program interpreter.

use crate::condition::{parse_conditions, Condition};
use crate::{Program, ScriptError};

/// Cost ceiling for a single puzzle run: an eighth of a block's budget.
pub const MAX_CONDITIONS_COST: u64 = 11_000_000_000 / 8;

/// Runs a program against a solution.
///
/// Implementations wrap a real interpreter. Failures are not recoverable for
/// the spend being examined and surface as [`ScriptError`].
pub trait ScriptEvaluator {
    fn run(&self, program: &Program, solution: &Program, max_cost: u64)
        -> Result<Program, ScriptError>;
}

impl<E: ScriptEvaluator + ?Sized> ScriptEvaluator for &E {
    fn run(
        &self,
        program: &Program,
        solution: &Program,
        max_cost: u64,
    ) -> Result<Program, ScriptError> {
        (**self).run(program, solution, max_cost)
    }
}

/// Run `program` with `solution` and parse the output as conditions.
pub fn conditions_for_solution<E: ScriptEvaluator + ?Sized>(
    evaluator: &E,
    program: &Program,
    solution: &Program,
    max_cost: u64,
) -> Result<Vec<Condition>, ScriptError> {
    let output = evaluator.run(program, solution, max_cost)?;
    parse_conditions(&output)
}
