//! Nullable infrastructure for deterministic testing.
//!
//! The outside world (wall clock, script evaluator, persistent ledger) sits
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod evaluator;
pub mod store;

pub use clock::NullClock;
pub use evaluator::NullEvaluator;
pub use store::NullStakeStore;
