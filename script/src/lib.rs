//! Script model for stake lock puzzles.
//!
//! Programs are binary trees of atoms. This crate knows how to build, hash,
//! serialize, curry and uncurry them, and how to read the condition list a
//! program emits. Running a program is delegated to a [`ScriptEvaluator`]
//! supplied by the caller; no interpreter lives here.

pub mod condition;
pub mod curry;
pub mod error;
pub mod evaluator;
pub mod program;
pub mod serialize;
pub mod templates;

pub use condition::{parse_conditions, Condition, ConditionOpcode};
pub use curry::{curried_tree_hash, curry, uncurry, Uncurried};
pub use error::ScriptError;
pub use evaluator::{conditions_for_solution, ScriptEvaluator, MAX_CONDITIONS_COST};
pub use program::Program;
pub use serialize::MAX_PROGRAM_DEPTH;
