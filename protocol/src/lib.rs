//! Stake commitment protocol.
//!
//! Everything here is a pure function of its arguments: deriving the lock
//! puzzle for `(time_lock, recipient)`, building the recipient's unlock
//! solution, and recognising stake creations in spends by decoding the
//! metadata remark and cross-checking it against the coins actually created.

pub mod commitment;
pub mod decorator;
pub mod error;
pub mod metadata;

pub use commitment::{
    build_unlock_solution, derive_lock_script_hash, extract_metadata_and_outputs,
    generate_stake_spend, lock_script, match_and_validate, match_from_spend,
};
pub use decorator::{make_delegated_solution, DecoratorConfig, Payment, StakePuzzleDecorator};
pub use error::ProtocolError;
pub use metadata::{CodecError, StakeMetadata, STAKE_METADATA_VERSION, STAKE_REMARK_TAG};
