//! Immutable program trees.

use std::{fmt, mem};

use stakelock_crypto::sha256_multi;
use stakelock_types::coin::u64_to_signed_bytes;
use stakelock_types::Bytes32;

const ATOM_PREFIX: &[u8] = &[0x01];
const PAIR_PREFIX: &[u8] = &[0x02];

/// A program: either an atom (byte string) or a pair of programs.
///
/// Lists are right-nested pairs terminated by the empty atom (`nil`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Program {
    Atom(Vec<u8>),
    Pair(Box<Program>, Box<Program>),
}

impl Program {
    pub fn nil() -> Self {
        Program::Atom(Vec::new())
    }

    pub fn atom(bytes: impl Into<Vec<u8>>) -> Self {
        Program::Atom(bytes.into())
    }

    /// Atom holding the minimal signed encoding of `value`.
    pub fn int(value: u64) -> Self {
        Program::Atom(u64_to_signed_bytes(value))
    }

    pub fn pair(first: Program, rest: Program) -> Self {
        Program::Pair(Box::new(first), Box::new(rest))
    }

    /// `nil`-terminated list of `items`.
    pub fn list(items: impl IntoIterator<Item = Program>) -> Self {
        let items: Vec<Program> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Program::nil(), |tail, head| Program::pair(head, tail))
    }

    /// `(q . self)`: a program that evaluates to `self`.
    pub fn quote(self) -> Self {
        Program::pair(Program::atom([1u8]), self)
    }

    /// `(head . self)`.
    pub fn cons(self, head: Program) -> Self {
        Program::pair(head, self)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Program::Atom(a) if a.is_empty())
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Program::Pair(..))
    }

    pub fn as_atom(&self) -> Option<&[u8]> {
        match self {
            Program::Atom(a) => Some(a),
            Program::Pair(..) => None,
        }
    }

    pub fn first(&self) -> Option<&Program> {
        match self {
            Program::Pair(f, _) => Some(f),
            Program::Atom(_) => None,
        }
    }

    pub fn rest(&self) -> Option<&Program> {
        match self {
            Program::Pair(_, r) => Some(r),
            Program::Atom(_) => None,
        }
    }

    /// Interpret an atom as a non-negative integer that fits in `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        let bytes = self.as_atom()?;
        if bytes.is_empty() {
            return Some(0);
        }
        if bytes[0] & 0x80 != 0 {
            return None;
        }
        let significant: &[u8] = match bytes.iter().position(|&b| b != 0) {
            Some(i) => &bytes[i..],
            None => return Some(0),
        };
        if significant.len() > 8 {
            return None;
        }
        Some(significant.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// Iterate over the elements of a list. Stops at the first non-pair.
    pub fn iter_list(&self) -> ListIter<'_> {
        ListIter { cursor: self }
    }

    /// Tree hash: `sha256(0x01 || atom)` for atoms and
    /// `sha256(0x02 || hash(first) || hash(rest))` for pairs.
    ///
    /// Iterative, so arbitrarily long lists do not grow the call stack.
    pub fn tree_hash(&self) -> Bytes32 {
        enum Step<'a> {
            Visit(&'a Program),
            Combine,
        }

        let mut steps = vec![Step::Visit(self)];
        let mut hashes: Vec<Bytes32> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Program::Atom(a)) => hashes.push(hash_atom(a)),
                Step::Visit(Program::Pair(first, rest)) => {
                    steps.push(Step::Combine);
                    steps.push(Step::Visit(rest));
                    steps.push(Step::Visit(first));
                }
                Step::Combine => {
                    // Two hashes were pushed by the visits scheduled above.
                    let rest = hashes.pop().unwrap_or(Bytes32::ZERO);
                    let first = hashes.pop().unwrap_or(Bytes32::ZERO);
                    hashes.push(hash_pair(&first, &rest));
                }
            }
        }
        hashes.pop().unwrap_or(Bytes32::ZERO)
    }
}

// Children are detached onto a heap stack before each node is freed, so
// dropping a deep tree never recurses.
impl Drop for Program {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node, &mut pending);
        }
    }
}

fn detach_children(node: &mut Program, pending: &mut Vec<Program>) {
    if let Program::Pair(first, rest) = node {
        if first.is_pair() {
            pending.push(mem::replace(first.as_mut(), Program::nil()));
        }
        if rest.is_pair() {
            pending.push(mem::replace(rest.as_mut(), Program::nil()));
        }
    }
}

/// Tree hash of an atom.
pub fn hash_atom(atom: &[u8]) -> Bytes32 {
    Bytes32::new(sha256_multi(&[ATOM_PREFIX, atom]))
}

/// Tree hash of a pair given its children's tree hashes.
pub fn hash_pair(first: &Bytes32, rest: &Bytes32) -> Bytes32 {
    Bytes32::new(sha256_multi(&[PAIR_PREFIX, first.as_bytes(), rest.as_bytes()]))
}

pub struct ListIter<'a> {
    cursor: &'a Program,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = &'a Program;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Program::Pair(first, rest) => {
                self.cursor = rest;
                Some(first)
            }
            Program::Atom(_) => None,
        }
    }
}

impl From<Bytes32> for Program {
    fn from(hash: Bytes32) -> Self {
        Program::atom(hash.as_bytes().to_vec())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Atom(a) if a.is_empty() => write!(f, "()"),
            Program::Atom(a) => write!(f, "0x{}", hex::encode(a)),
            Program::Pair(first, rest) => write!(f, "({:?} . {:?})", first, rest),
        }
    }
}
