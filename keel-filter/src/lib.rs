//! Predicate pushdown for the keel storage core.
//!
//! Predicates here operate on *raw encoded byte ranges* keyed by column
//! position: because the keel encodings are order-preserving, an unsigned
//! lexicographic comparison over stored bytes implements numeric and
//! ordinal comparison without decoding a single value. A predicate tree is
//! built once per scan, serialized to a compact byte format when the scan
//! executes on a remote node, and then reused for every row the scan
//! touches — which is why composite nodes carry explicit per-row state and
//! an explicit [`Predicate::reset`].

pub mod compare;
pub mod entry_filter;
pub mod predicate;
pub mod wire;

pub use compare::CompareOp;
pub use entry_filter::{EntryAccumulator, EntryFilter};
pub use predicate::{CompositePredicate, EvalState, Predicate, ValuePredicate};
