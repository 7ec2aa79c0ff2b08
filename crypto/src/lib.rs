//! Cryptographic primitives for stake lock scripts.
//!
//! - **SHA-256** for coin ids, program tree hashes and merkle nodes
//! - A generic merkle **commitment tree** with membership proofs

pub mod hash;
pub mod merkle;

pub use hash::{sha256, sha256_multi};
pub use merkle::{CommitmentTree, MerkleError, MerkleProof};
