//! Canonical byte serialization of programs.
//!
//! - `0xff` introduces a pair, followed by its first and rest.
//! - `0x80` is the empty atom.
//! - A single byte `<= 0x7f` is an atom holding that byte.
//! - Any other atom is a length prefix followed by the bytes. The count of
//!   leading one bits in the first prefix byte gives the prefix width.

use crate::{Program, ScriptError};

const PAIR_MARKER: u8 = 0xff;
const NIL_MARKER: u8 = 0x80;

/// Largest atom the length prefix can describe.
const MAX_ATOM_LEN: u64 = 0x4_0000_0000;

/// Deepest pair nesting `from_bytes` accepts, counting both the first and
/// rest sides, so it also bounds the length of a list.
pub const MAX_PROGRAM_DEPTH: usize = 2048;

impl Program {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Program::Pair(first, rest) => {
                    out.push(PAIR_MARKER);
                    stack.push(rest);
                    stack.push(first);
                }
                Program::Atom(atom) => write_atom(&mut out, atom),
            }
        }
        out
    }

    /// Parse exactly one program from `bytes`; trailing data is an error, as
    /// is nesting deeper than [`MAX_PROGRAM_DEPTH`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScriptError> {
        enum Step {
            Parse(usize),
            Cons,
        }

        let mut cursor = Cursor { bytes, pos: 0 };
        let mut steps = vec![Step::Parse(0)];
        let mut values: Vec<Program> = Vec::new();

        while let Some(step) = steps.pop() {
            match step {
                Step::Parse(depth) => {
                    let b = cursor.next_byte()?;
                    if b == PAIR_MARKER {
                        if depth >= MAX_PROGRAM_DEPTH {
                            return Err(deserialize_err("program nested too deeply"));
                        }
                        steps.push(Step::Cons);
                        steps.push(Step::Parse(depth + 1));
                        steps.push(Step::Parse(depth + 1));
                    } else {
                        values.push(Program::Atom(read_atom(&mut cursor, b)?));
                    }
                }
                Step::Cons => {
                    let rest = values.pop();
                    let first = values.pop();
                    match (first, rest) {
                        (Some(first), Some(rest)) => values.push(Program::pair(first, rest)),
                        _ => return Err(deserialize_err("unbalanced pair")),
                    }
                }
            }
        }

        if cursor.pos != bytes.len() {
            return Err(deserialize_err("trailing bytes after program"));
        }
        match (values.pop(), values.is_empty()) {
            (Some(program), true) => Ok(program),
            _ => Err(deserialize_err("unbalanced program")),
        }
    }
}

fn write_atom(out: &mut Vec<u8>, atom: &[u8]) {
    let len = atom.len() as u64;
    if len == 0 {
        out.push(NIL_MARKER);
        return;
    }
    if len == 1 && atom[0] <= 0x7f {
        out.push(atom[0]);
        return;
    }
    if len < 0x40 {
        out.push(0x80 | len as u8);
    } else if len < 0x2000 {
        out.push(0xc0 | (len >> 8) as u8);
        out.push(len as u8);
    } else if len < 0x10_0000 {
        out.push(0xe0 | (len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else if len < 0x800_0000 {
        out.push(0xf0 | (len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    } else {
        out.push(0xf8 | (len >> 32) as u8);
        out.push((len >> 24) as u8);
        out.push((len >> 16) as u8);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(atom);
}

fn read_atom(cursor: &mut Cursor<'_>, first: u8) -> Result<Vec<u8>, ScriptError> {
    if first == NIL_MARKER {
        return Ok(Vec::new());
    }
    if first & 0x80 == 0 {
        return Ok(vec![first]);
    }

    let mut prefix_bits = 0u32;
    let mut mask = 0x80u8;
    let mut head = first;
    while head & mask != 0 {
        prefix_bits += 1;
        head &= !mask;
        mask >>= 1;
    }
    if prefix_bits > 5 {
        return Err(deserialize_err("atom length prefix too wide"));
    }

    let mut len = head as u64;
    for _ in 1..prefix_bits {
        len = (len << 8) | cursor.next_byte()? as u64;
    }
    if len >= MAX_ATOM_LEN {
        return Err(deserialize_err("atom too large"));
    }
    cursor.take(len as usize).map(<[u8]>::to_vec)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next_byte(&mut self) -> Result<u8, ScriptError> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| deserialize_err("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ScriptError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| deserialize_err("atom runs past end of input"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

fn deserialize_err(msg: &str) -> ScriptError {
    ScriptError::Deserialize(msg.to_string())
}
