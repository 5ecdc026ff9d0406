//! Row materialization for the keel storage core.
//!
//! During a scan, the entry filter surfaces `(column position, byte
//! range)` pairs for rows that survive predicate evaluation. This crate
//! turns those ranges back into typed values — selectively: only the
//! columns the caller asked for are decoded, into a caller-supplied
//! [`TypedRow`] template that is mutated in place row after row.
//!
//! Per-column decoding goes through pluggable [`FieldSerializer`]s chosen
//! by a versioned registry (the version scheme is owned by the table
//! catalog and merely consumed here); serializer sets are memoized in a
//! bounded LRU cache keyed by the column-format sequence.

pub mod accumulator;
pub mod registry;
pub mod row;
pub mod serializer;

pub use accumulator::RowAccumulator;
pub use registry::{FormatVersion, SerializerCache, SerializerSet, VersionedSerializers};
pub use row::TypedRow;
pub use serializer::FieldSerializer;
