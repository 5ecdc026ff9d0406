use std::io;
use thiserror::Error;

/// Unified error type for all keel operations.
///
/// The variants follow the failure taxonomy of the codec/scan core:
///
/// - **Capacity errors** ([`Error::CapacityExceeded`]): a buffer grow would
///   pass the maximum representable encode size. Fatal for that encode
///   operation; nothing is retried here.
/// - **Decode errors** ([`Error::Corrupt`]): a column's byte range cannot be
///   interpreted by its serializer. These indicate data or schema corruption
///   the accumulator cannot recover from locally and are propagated to the
///   scan owner.
/// - **Wire errors** ([`Error::MalformedPredicate`]): malformed predicate
///   bytes received from a remote scan node. Explicitly recoverable: the
///   transport layer can reject or re-request without touching the scan
///   thread's state.
/// - **Misuse / infrastructure** ([`Error::InvalidArgumentError`],
///   [`Error::Internal`], [`Error::Io`]).
///
/// # Thread Safety
///
/// `Error` is `Send + Sync`, so scan failures can cross partition-worker
/// boundaries.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error surfaced by a per-column serializer resource.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid user input or API parameter.
    ///
    /// Examples: encoding more fields than the entry was declared with,
    /// requesting an unknown serializer version string, or handing a
    /// serializer a value of the wrong logical type.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Buffer growth would exceed the maximum representable encode size.
    #[error("buffer capacity exceeded: required {required} bytes, max {max}")]
    CapacityExceeded { required: usize, max: usize },

    /// A byte range could not be decoded by the column's serializer.
    ///
    /// Raw cell data that fails to decode means the stored bytes and the
    /// schema disagree; the row cannot be materialized.
    #[error("corrupt encoding: {0}")]
    Corrupt(String),

    /// Malformed predicate wire bytes.
    ///
    /// Signaled while reconstructing a predicate tree shipped from a remote
    /// node, before any scan work has happened.
    #[error("malformed predicate: {0}")]
    MalformedPredicate(String),

    /// An internal invariant was violated; indicates a bug.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}
