//! Currying: binding leading arguments into a program.
//!
//! `curry(MOD, [a1, a2])` produces
//! `(a (q . MOD) (c (q . a1) (c (q . a2) 1)))`, a program that prepends the
//! curried values to whatever solution it is run with and then runs `MOD`.

use stakelock_types::Bytes32;

use crate::program::{hash_atom, hash_pair};
use crate::Program;

const OP_QUOTE: u8 = 1;
const OP_APPLY: u8 = 2;
const OP_CONS: u8 = 4;

/// A curried program split back into its template and arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Uncurried {
    pub module: Program,
    pub args: Vec<Program>,
}

/// Bind `args` into `module`.
pub fn curry(module: &Program, args: &[Program]) -> Program {
    let env = args.iter().rev().fold(Program::int(1), |tail, arg| {
        Program::list([Program::int(OP_CONS as u64), arg.clone().quote(), tail])
    });
    Program::list([Program::int(OP_APPLY as u64), module.clone().quote(), env])
}

/// Recognise a program built by [`curry`]. Anything else yields `None`.
pub fn uncurry(program: &Program) -> Option<Uncurried> {
    let items: Vec<&Program> = program.iter_list().collect();
    if items.len() != 3 || !list_is_proper(program, 3) {
        return None;
    }
    if items[0].as_atom()? != [OP_APPLY] {
        return None;
    }
    let module = unquote(items[1])?;

    let mut args = Vec::new();
    let mut env = items[2];
    loop {
        if env.as_atom() == Some(&[1u8][..]) {
            break;
        }
        let parts: Vec<&Program> = env.iter_list().collect();
        if parts.len() != 3 || !list_is_proper(env, 3) || parts[0].as_atom()? != [OP_CONS] {
            return None;
        }
        args.push(unquote(parts[1])?.clone());
        env = parts[2];
    }

    Some(Uncurried {
        module: module.clone(),
        args,
    })
}

/// Tree hash of `curry(module, args)` computed from hashes alone.
///
/// Lets a verifier derive a curried puzzle hash when it only knows the tree
/// hash of an argument (for example a recipient's puzzle hash).
pub fn curried_tree_hash(module_hash: &Bytes32, arg_hashes: &[Bytes32]) -> Bytes32 {
    let nil = hash_atom(&[]);
    let one = hash_atom(&[1]);
    let q = hash_atom(&[OP_QUOTE]);
    let a = hash_atom(&[OP_APPLY]);
    let c = hash_atom(&[OP_CONS]);

    let env = arg_hashes.iter().rev().fold(one, |tail, arg| {
        let quoted = hash_pair(&q, arg);
        hash_pair(&c, &hash_pair(&quoted, &hash_pair(&tail, &nil)))
    });
    let quoted_module = hash_pair(&q, module_hash);
    hash_pair(&a, &hash_pair(&quoted_module, &hash_pair(&env, &nil)))
}

fn unquote(program: &Program) -> Option<&Program> {
    match program.first()?.as_atom()? {
        [OP_QUOTE] => program.rest(),
        _ => None,
    }
}

fn list_is_proper(program: &Program, len: usize) -> bool {
    let mut cursor = program;
    for _ in 0..len {
        match cursor.rest() {
            Some(rest) => cursor = rest,
            None => return false,
        }
    }
    cursor.is_nil()
}
