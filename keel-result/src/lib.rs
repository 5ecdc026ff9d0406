//! Error types and result definitions for the keel row-codec stack.
//!
//! keel uses a single error enum ([`Error`]) across its crates rather than
//! crate-specific error types. Operations that can fail return
//! [`Result<T>`]; errors propagate upward with the `?` operator and are
//! matched structurally at API boundaries (e.g. the scan executor decides
//! whether a malformed remote predicate is retried or rejected).
//!
//! The encoding crate additionally carries small plain `EncodeError` /
//! `DecodeError` enums for its innermost codec loops; those convert into
//! [`Error`] at the crate boundary.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
