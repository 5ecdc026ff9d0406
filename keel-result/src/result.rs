use crate::error::Error;

/// Result type alias used throughout keel.
pub type Result<T> = std::result::Result<T, Error>;
