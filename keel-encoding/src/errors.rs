use crate::FieldType;

/// Error type for encoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The provided value does not match the requested FieldType.
    TypeMismatch {
        expected: FieldType,
        got: &'static str,
    },
}

/// Error type for decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The input slice does not contain enough bytes to decode a value.
    NotEnoughData,
    /// The byte format is invalid for the target type (e.g. a scalar header
    /// outside the legal range, or text bytes below the shift floor).
    InvalidFormat,
}

impl From<DecodeError> for keel_result::Error {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::NotEnoughData => {
                keel_result::Error::Corrupt("byte range truncated mid-value".into())
            }
            DecodeError::InvalidFormat => {
                keel_result::Error::Corrupt("byte range is not a valid encoding".into())
            }
        }
    }
}

impl From<EncodeError> for keel_result::Error {
    fn from(e: EncodeError) -> Self {
        match e {
            EncodeError::TypeMismatch { expected, got } => keel_result::Error::InvalidArgumentError(
                format!("value of kind {got} cannot encode as {expected:?}"),
            ),
        }
    }
}
