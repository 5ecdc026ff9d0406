//! The predicate tree: a closed tagged-variant type with one case per
//! kind, dispatched by pattern matching.
//!
//! A predicate instance is constructed once per scan and reused across
//! every row the scan touches. Composite nodes carry a sticky failure
//! flag: once a row fails evaluation, further [`Predicate::matches`] calls
//! return false immediately without re-evaluating children, until
//! [`Predicate::reset`] is invoked. This amortizes allocation across a
//! scan, but callers that forget to `reset()` between rows will silently
//! and permanently reject all further rows — the hazard is documented
//! here, not detected at runtime.

use std::cmp::Ordering;

use roaring::RoaringBitmap;

use crate::compare::CompareOp;

/// Per-row evaluation state of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    Clean,
    Failed,
}

/// A composable boolean predicate over raw column byte ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Value(ValuePredicate),
    And(CompositePredicate),
    Or(CompositePredicate),
}

/// Leaf predicate: compares one column's raw bytes against a fixed encoded
/// comparand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePredicate {
    pub op: CompareOp,
    pub column: u32,
    /// Encoded comparand bytes. Empty means a null comparand: it matches
    /// both a true null and an explicitly zero-length range (the encoding
    /// does not distinguish the two).
    pub comparand: Vec<u8>,
    /// When the comparand is non-null, controls whether a null column
    /// value short-circuits rejection (`true`) or is treated with SQL-ish
    /// leniency where only `NotEqual` still matches (`false`).
    pub remove_nulls: bool,
    /// Set when the column was encoded in descending order; comparison
    /// complements the stored bytes before comparing against the
    /// (ascending-encoded) comparand.
    pub descending: bool,
}

impl ValuePredicate {
    pub fn new(
        op: CompareOp,
        column: u32,
        comparand: Vec<u8>,
        remove_nulls: bool,
        descending: bool,
    ) -> Self {
        Self {
            op,
            column,
            comparand,
            remove_nulls,
            descending,
        }
    }

    fn matches(&self, column: u32, data: &[u8]) -> bool {
        if column != self.column {
            return true;
        }
        if data.is_empty() {
            if self.comparand.is_empty() {
                return true;
            }
            if self.remove_nulls {
                return false;
            }
            return self.op == CompareOp::NotEqual;
        }
        if self.comparand.is_empty() {
            return self.op == CompareOp::NotEqual;
        }
        let ord = compare_ranges(data, &self.comparand, self.descending);
        self.op.matches_ordering(ord)
    }
}

/// Ordered child list plus the per-row sticky state shared by `And`/`Or`.
#[derive(Debug, Clone)]
pub struct CompositePredicate {
    pub(crate) children: Vec<Predicate>,
    pub(crate) state: EvalState,
    pub(crate) matched: usize,
}

impl CompositePredicate {
    pub(crate) fn new(children: Vec<Predicate>) -> Self {
        Self {
            children,
            state: EvalState::Clean,
            matched: 0,
        }
    }

    pub fn children(&self) -> &[Predicate] {
        &self.children
    }

    pub fn state(&self) -> EvalState {
        self.state
    }

    /// Successful `matches` calls since the last reset.
    pub fn matched_count(&self) -> usize {
        self.matched
    }
}

// Structural equality ignores per-row evaluation state, so a predicate
// freshly deserialized compares equal to the one that produced the bytes
// even after that one has been used.
impl PartialEq for CompositePredicate {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl Eq for CompositePredicate {}

impl Predicate {
    /// Build a leaf comparison predicate.
    pub fn value(
        op: CompareOp,
        column: u32,
        comparand: Vec<u8>,
        remove_nulls: bool,
        descending: bool,
    ) -> Predicate {
        Predicate::Value(ValuePredicate::new(
            op,
            column,
            comparand,
            remove_nulls,
            descending,
        ))
    }

    /// Conjunction. A single-element list collapses to that element.
    pub fn and(mut children: Vec<Predicate>) -> Predicate {
        if children.len() == 1 {
            return children.pop().unwrap();
        }
        Predicate::And(CompositePredicate::new(children))
    }

    /// Disjunction. A single-element list collapses to that element.
    pub fn or(mut children: Vec<Predicate>) -> Predicate {
        if children.len() == 1 {
            return children.pop().unwrap();
        }
        Predicate::Or(CompositePredicate::new(children))
    }

    /// Whether this predicate constrains the given column position.
    pub fn applies(&self, column: u32) -> bool {
        match self {
            Predicate::Value(v) => v.column == column,
            Predicate::And(c) | Predicate::Or(c) => {
                c.children.iter().any(|p| p.applies(column))
            }
        }
    }

    /// Evaluate against the raw byte range for one column. An empty range
    /// represents a null column value.
    ///
    /// Composite nodes in the `Failed` state return false without child
    /// evaluation; see the module docs for the reset contract.
    pub fn matches(&mut self, column: u32, data: &[u8]) -> bool {
        match self {
            Predicate::Value(v) => v.matches(column, data),
            Predicate::And(c) => {
                if c.state == EvalState::Failed {
                    return false;
                }
                for child in &mut c.children {
                    if !child.applies(column) {
                        continue;
                    }
                    if !child.matches(column, data) {
                        c.state = EvalState::Failed;
                        return false;
                    }
                }
                c.matched += 1;
                true
            }
            Predicate::Or(c) => {
                if c.state == EvalState::Failed {
                    return false;
                }
                let mut any_applicable = false;
                for child in &mut c.children {
                    if !child.applies(column) {
                        continue;
                    }
                    any_applicable = true;
                    if child.matches(column, data) {
                        c.matched += 1;
                        return true;
                    }
                }
                if !any_applicable {
                    return true;
                }
                c.state = EvalState::Failed;
                false
            }
        }
    }

    /// Whether a post-scan residual check is still required after all
    /// per-column matches (true when any leaf constrains absent columns).
    pub fn check_after(&self) -> bool {
        match self {
            Predicate::Value(v) => v.remove_nulls || v.comparand.is_empty(),
            Predicate::And(c) | Predicate::Or(c) => {
                c.children.iter().any(|p| p.check_after())
            }
        }
    }

    /// Record every column position this predicate consults into `checked`.
    pub fn set_checked_columns(&self, checked: &mut RoaringBitmap) {
        match self {
            Predicate::Value(v) => {
                checked.insert(v.column);
            }
            Predicate::And(c) | Predicate::Or(c) => {
                for child in &c.children {
                    child.set_checked_columns(checked);
                }
            }
        }
    }

    /// Clear the sticky failure flag and per-row counters, recursively.
    /// Must be called between independent row evaluations whenever the
    /// predicate instance is reused.
    pub fn reset(&mut self) {
        match self {
            Predicate::Value(_) => {}
            Predicate::And(c) | Predicate::Or(c) => {
                for child in &mut c.children {
                    child.reset();
                }
                c.state = EvalState::Clean;
                c.matched = 0;
            }
        }
    }
}

/// Lexicographic comparison of a stored range against an
/// ascending-encoded comparand, complementing stored bytes first when the
/// column was written descending.
fn compare_ranges(data: &[u8], comparand: &[u8], descending: bool) -> Ordering {
    if !descending {
        return data.cmp(comparand);
    }
    let n = data.len().min(comparand.len());
    for i in 0..n {
        match (!data[i]).cmp(&comparand[i]) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    data.len().cmp(&comparand.len())
}
