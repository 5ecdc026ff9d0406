//! Byte-exact predicate wire format, for shipping predicate trees to
//! remote scan executors.
//!
//! ```text
//! predicate := [1-byte tag][payload]
//! AND/OR payload   := [4-byte BE child count][child predicate]*
//! VALUE payload    := [1-byte op][4-byte BE column]
//!                     [1-byte remove_nulls][1-byte descending]
//!                     [4-byte BE comparand len][comparand bytes]
//! ```
//!
//! Tags form a small closed enumeration; there is no version field, so
//! forward compatibility across nodes running different predicate sets is
//! the caller's responsibility. Malformed input is a checked
//! [`keel_result::Error::MalformedPredicate`] — the transport layer can
//! reject the request without crashing the scan thread.

use keel_result::{Error, Result};

use crate::compare::CompareOp;
use crate::predicate::{CompositePredicate, Predicate, ValuePredicate};

pub const TAG_AND: u8 = 0x01;
pub const TAG_OR: u8 = 0x02;
pub const TAG_VALUE: u8 = 0x03;

impl Predicate {
    /// Serialize this predicate tree.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_predicate(self, &mut out);
        out
    }

    /// Reconstruct a predicate starting at `offset`, returning it together
    /// with the number of bytes consumed (measured relative to `offset`),
    /// so callers can parse a sequence of sibling predicates back-to-back.
    pub fn from_bytes(data: &[u8], offset: usize) -> Result<(Predicate, usize)> {
        let (p, end) = read_predicate(data, offset)?;
        Ok((p, end - offset))
    }
}

fn write_predicate(p: &Predicate, out: &mut Vec<u8>) {
    match p {
        Predicate::And(c) => write_composite(TAG_AND, c, out),
        Predicate::Or(c) => write_composite(TAG_OR, c, out),
        Predicate::Value(v) => {
            out.push(TAG_VALUE);
            out.push(v.op.to_byte());
            out.extend_from_slice(&v.column.to_be_bytes());
            out.push(v.remove_nulls as u8);
            out.push(v.descending as u8);
            out.extend_from_slice(&(v.comparand.len() as u32).to_be_bytes());
            out.extend_from_slice(&v.comparand);
        }
    }
}

fn write_composite(tag: u8, c: &CompositePredicate, out: &mut Vec<u8>) {
    out.push(tag);
    out.extend_from_slice(&(c.children.len() as u32).to_be_bytes());
    for child in &c.children {
        write_predicate(child, out);
    }
}

// Readers take and return absolute positions; `from_bytes` converts back
// to a relative consumed count at the boundary.

fn read_u8(data: &[u8], pos: usize, what: &str) -> Result<(u8, usize)> {
    match data.get(pos) {
        Some(b) => Ok((*b, pos + 1)),
        None => Err(Error::MalformedPredicate(format!(
            "truncated while reading {what} at byte {pos}"
        ))),
    }
}

fn read_u32(data: &[u8], pos: usize, what: &str) -> Result<(u32, usize)> {
    match data.get(pos..pos + 4) {
        Some(b) => Ok((u32::from_be_bytes(b.try_into().unwrap()), pos + 4)),
        None => Err(Error::MalformedPredicate(format!(
            "truncated while reading {what} at byte {pos}"
        ))),
    }
}

fn read_predicate(data: &[u8], pos: usize) -> Result<(Predicate, usize)> {
    let (tag, pos) = read_u8(data, pos, "type tag")?;
    match tag {
        TAG_AND => {
            let (children, pos) = read_children(data, pos)?;
            Ok((Predicate::And(CompositePredicate::new(children)), pos))
        }
        TAG_OR => {
            let (children, pos) = read_children(data, pos)?;
            Ok((Predicate::Or(CompositePredicate::new(children)), pos))
        }
        TAG_VALUE => {
            let (op, pos) = read_u8(data, pos, "compare op")?;
            let op = CompareOp::from_byte(op)?;
            let (column, pos) = read_u32(data, pos, "column position")?;
            let (remove_nulls, pos) = read_u8(data, pos, "remove-nulls flag")?;
            let (descending, pos) = read_u8(data, pos, "descending flag")?;
            let (len, pos) = read_u32(data, pos, "comparand length")?;
            let len = len as usize;
            let comparand = data.get(pos..pos + len).ok_or_else(|| {
                Error::MalformedPredicate(format!(
                    "comparand claims {len} bytes but only {} remain",
                    data.len().saturating_sub(pos)
                ))
            })?;
            Ok((
                Predicate::Value(ValuePredicate::new(
                    op,
                    column,
                    comparand.to_vec(),
                    remove_nulls != 0,
                    descending != 0,
                )),
                pos + len,
            ))
        }
        other => Err(Error::MalformedPredicate(format!(
            "unknown predicate tag 0x{other:02x} at byte {pos}",
            pos = pos - 1
        ))),
    }
}

fn read_children(data: &[u8], pos: usize) -> Result<(Vec<Predicate>, usize)> {
    let (count, mut pos) = read_u32(data, pos, "child count")?;
    let mut children = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let (child, next) = read_predicate(data, pos)?;
        children.push(child);
        pos = next;
    }
    Ok((children, pos))
}
