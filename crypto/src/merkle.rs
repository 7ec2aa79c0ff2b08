//! Merkle commitment tree over 32-byte leaves.
//!
//! The leaf list is split into a balanced binary tree (the first half gets
//! the extra element). Hashes are domain separated:
//!
//! - leaf: `sha256(0x01 || leaf)`
//! - node: `sha256(0x02 || left || right)`
//!
//! A proof is a bit path plus the sibling hashes from the leaf upward. Bit
//! `i` of the path is set when the running hash is the *right* child at
//! depth `i`. This is the layout the on-chain `p2_1_of_n` template folds.

use serde::{Deserialize, Serialize};
use stakelock_types::Bytes32;
use thiserror::Error;

use crate::hash::sha256_multi;

const LEAF_PREFIX: &[u8] = &[0x01];
const NODE_PREFIX: &[u8] = &[0x02];

/// Deepest tree a `u32` bit path can describe.
const MAX_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("commitment tree needs at least one leaf")]
    Empty,

    #[error("commitment tree deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Membership proof for one leaf.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub path: u32,
    pub siblings: Vec<Bytes32>,
}

impl MerkleProof {
    /// Fold the proof starting from `leaf`, returning the implied root.
    pub fn root_from_leaf(&self, leaf: &Bytes32) -> Bytes32 {
        let mut running = hash_leaf(leaf);
        let mut path = self.path;
        for sibling in &self.siblings {
            running = if path & 1 == 1 {
                hash_node(sibling, &running)
            } else {
                hash_node(&running, sibling)
            };
            path >>= 1;
        }
        running
    }
}

/// A merkle tree committing to a list of leaves.
#[derive(Clone, Debug)]
pub struct CommitmentTree {
    root: Bytes32,
    proofs: Vec<(Bytes32, MerkleProof)>,
}

impl CommitmentTree {
    pub fn new(leaves: Vec<Bytes32>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }
        let (root, proofs) = build(&leaves);
        if proofs.iter().any(|(_, p)| p.siblings.len() > MAX_DEPTH) {
            return Err(MerkleError::TooDeep);
        }
        Ok(Self { root, proofs })
    }

    pub fn root(&self) -> Bytes32 {
        self.root
    }

    /// Proof for `leaf`, or `None` if it is not committed to.
    pub fn proof(&self, leaf: &Bytes32) -> Option<MerkleProof> {
        self.proofs
            .iter()
            .find(|(l, _)| l == leaf)
            .map(|(_, p)| p.clone())
    }

    pub fn leaf_count(&self) -> usize {
        self.proofs.len()
    }
}

/// Check that `proof` places `leaf` under `root`.
pub fn verify(root: &Bytes32, leaf: &Bytes32, proof: &MerkleProof) -> bool {
    proof.root_from_leaf(leaf) == *root
}

fn hash_leaf(leaf: &Bytes32) -> Bytes32 {
    Bytes32::new(sha256_multi(&[LEAF_PREFIX, leaf.as_bytes()]))
}

fn hash_node(left: &Bytes32, right: &Bytes32) -> Bytes32 {
    Bytes32::new(sha256_multi(&[NODE_PREFIX, left.as_bytes(), right.as_bytes()]))
}

fn build(leaves: &[Bytes32]) -> (Bytes32, Vec<(Bytes32, MerkleProof)>) {
    if let [leaf] = leaves {
        let proof = MerkleProof {
            path: 0,
            siblings: Vec::new(),
        };
        return (hash_leaf(leaf), vec![(*leaf, proof)]);
    }

    let midpoint = (leaves.len() + 1) / 2;
    let (left_root, mut left_proofs) = build(&leaves[..midpoint]);
    let (right_root, mut right_proofs) = build(&leaves[midpoint..]);

    for (_, proof) in left_proofs.iter_mut() {
        proof.siblings.push(right_root);
    }
    for (_, proof) in right_proofs.iter_mut() {
        if let Some(bit) = 1u32.checked_shl(proof.siblings.len() as u32) {
            proof.path |= bit;
        }
        proof.siblings.push(left_root);
    }

    left_proofs.append(&mut right_proofs);
    (hash_node(&left_root, &right_root), left_proofs)
}
