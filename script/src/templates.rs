//! Compiled puzzle templates used by stake commitments.
//!
//! Operator atoms: `q`=1 `a`=2 `i`=3 `c`=4 `f`=5 `r`=6 `l`=7 `x`=8 `=`=9
//! `sha256`=11 `lsh`=23 `logand`=24. Environment paths are the usual
//! little-endian bit paths (`2` first, `3` rest, `5` second, ...).

use std::sync::LazyLock;

use stakelock_crypto::MerkleProof;
use stakelock_types::Bytes32;

use crate::Program;

const Q: u64 = 1;
const A: u64 = 2;
const I: u64 = 3;
const C: u64 = 4;
const F: u64 = 5;
const R: u64 = 6;
const L: u64 = 7;
const X: u64 = 8;
const EQ: u64 = 9;
const SHA256: u64 = 11;
const LSH: u64 = 23;
const LOGAND: u64 = 24;

/// Spends by revealing one puzzle committed to by a merkle root.
///
/// Curried with `(ROOT)`. Solution: `(proof puzzle solution)` where `proof`
/// is `(path . siblings)`. Runs `puzzle` with `solution` iff the leaf hash
/// of `puzzle` folds up to `ROOT`; raises otherwise.
pub static P2_1_OF_N_MOD: LazyLock<Program> = LazyLock::new(p2_1_of_n);

/// Prepends a fixed condition to an inner puzzle's output.
///
/// Curried with `(CONDITION INNER_PUZZLE)`. Solution: `(inner_solution)`.
pub static AUGMENTED_CONDITION_MOD: LazyLock<Program> = LazyLock::new(|| {
    op(C, [path(2), op(A, [path(5), path(11)])])
});

/// Ordinary payment puzzle: a signature over the delegated puzzle plus its
/// output.
///
/// Curried with `(PUBKEY)`. Solution: `(delegated_puzzle delegated_solution)`.
pub static P2_DELEGATED_MOD: LazyLock<Program> = LazyLock::new(p2_delegated);

pub static P2_1_OF_N_MOD_HASH: LazyLock<Bytes32> = LazyLock::new(|| P2_1_OF_N_MOD.tree_hash());
pub static AUGMENTED_CONDITION_MOD_HASH: LazyLock<Bytes32> =
    LazyLock::new(|| AUGMENTED_CONDITION_MOD.tree_hash());
pub static P2_DELEGATED_MOD_HASH: LazyLock<Bytes32> =
    LazyLock::new(|| P2_DELEGATED_MOD.tree_hash());

/// `(path . (sibling ...))` as consumed by [`P2_1_OF_N_MOD`].
pub fn merkle_proof_program(proof: &MerkleProof) -> Program {
    Program::pair(
        Program::int(proof.path as u64),
        Program::list(proof.siblings.iter().copied().map(Program::from)),
    )
}

fn path(n: u64) -> Program {
    Program::int(n)
}

fn op<const N: usize>(code: u64, args: [Program; N]) -> Program {
    Program::list(args).cons(Program::int(code))
}

fn quoted(value: Program) -> Program {
    value.quote()
}

/// `(a (i cond (q . then) (q . else)) 1)`
fn branch(cond: Program, then: Program, otherwise: Program) -> Program {
    op(A, [op(I, [cond, quoted(then), quoted(otherwise)]), path(1)])
}

/// `(a f (c f (c arg ())))`: call the function at `f` with itself and `arg`.
fn call_self(f: u64, arg: Program) -> Program {
    op(A, [path(f), op(C, [path(f), op(C, [arg, Program::nil()])])])
}

/// Tree hash function. Environment: `(SELF value)`.
fn sha_tree() -> Program {
    branch(
        op(L, [path(5)]),
        op(SHA256, [
            quoted(Program::int(2)),
            call_self(2, op(F, [path(5)])),
            call_self(2, op(R, [path(5)])),
        ]),
        op(SHA256, [quoted(Program::int(1)), path(5)]),
    )
}

/// Merkle fold. Environment: `(SELF running bitpath . siblings)`.
fn fold_proof() -> Program {
    let sibling = || op(F, [path(15)]);
    let next = branch(
        op(LOGAND, [quoted(Program::int(1)), path(11)]),
        op(SHA256, [quoted(Program::int(2)), sibling(), path(5)]),
        op(SHA256, [quoted(Program::int(2)), path(5), sibling()]),
    );
    let shifted = op(LSH, [path(11), quoted(Program::atom([0xffu8]))]);
    let recurse = op(A, [
        path(2),
        op(C, [path(2), op(C, [next, op(C, [shifted, op(R, [path(15)])])])]),
    ]);
    branch(path(15), recurse, path(5))
}

/// Environment after installing helpers: `((SHATREE . FOLD) ROOT proof puzzle solution)`.
fn p2_1_of_n() -> Program {
    let leaf_hash = op(SHA256, [quoted(Program::int(1)), call_self(4, path(23))]);
    let folded = op(A, [path(6), op(C, [path(6), op(C, [leaf_hash, path(11)])])]);
    let body = branch(
        op(EQ, [path(5), folded]),
        op(A, [path(23), path(47)]),
        op(X, []),
    );
    with_helpers(body, Program::pair(sha_tree(), fold_proof()))
}

/// Environment after installing helpers: `(SHATREE PUBKEY delegated_puzzle delegated_solution)`.
fn p2_delegated() -> Program {
    let signature = op(C, [
        quoted(Program::int(50)),
        op(C, [path(5), op(C, [call_self(2, path(11)), Program::nil()])]),
    ]);
    let body = op(C, [signature, op(A, [path(11), path(23)])]);
    with_helpers(body, sha_tree())
}

/// `(a (q . body) (c (q . helpers) 1))`
fn with_helpers(body: Program, helpers: Program) -> Program {
    op(A, [quoted(body), op(C, [quoted(helpers), path(1)])])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn augmented_condition_shape() {
        assert_eq!(
            format!("{:?}", *AUGMENTED_CONDITION_MOD),
            "(0x04 . (0x02 . ((0x02 . (0x05 . (0x0b . ()))) . ())))"
        );
    }

    #[test]
    fn template_hashes_are_distinct() {
        let hashes = [
            *P2_1_OF_N_MOD_HASH,
            *AUGMENTED_CONDITION_MOD_HASH,
            *P2_DELEGATED_MOD_HASH,
        ];
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
        assert_ne!(hashes[0], hashes[2]);
    }

    #[test]
    fn templates_survive_serialization() {
        for t in [&*P2_1_OF_N_MOD, &*AUGMENTED_CONDITION_MOD, &*P2_DELEGATED_MOD] {
            assert_eq!(&Program::from_bytes(&t.to_bytes()).unwrap(), t);
        }
    }

    #[test]
    fn proof_program_layout() {
        let proof = MerkleProof {
            path: 1,
            siblings: vec![Bytes32::new([4; 32])],
        };
        let p = merkle_proof_program(&proof);
        assert_eq!(p.first().and_then(Program::as_u64), Some(1));
        assert_eq!(p.rest().map(|s| s.iter_list().count()), Some(1));

        let empty = merkle_proof_program(&MerkleProof { path: 0, siblings: vec![] });
        assert_eq!(empty, Program::pair(Program::nil(), Program::nil()));
    }
}
