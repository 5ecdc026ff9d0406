//! Decimal column codec.
//!
//! Decimals follow Decimal128 semantics: a scaled `i128` plus a per-column
//! scale that is fixed by the schema. Because every value in a column
//! shares one scale, encoding only the scaled integer (via the 128-bit
//! scalar form) keeps lexicographic order equal to numeric order within the
//! column. Cross-scale ordering is outside the supported domain.

#![forbid(unsafe_code)]

use std::fmt;

use crate::errors::DecodeError;
use crate::scalar::{decode_i128, encode_i128_into, encoded_len_i128};

/// Widest scale a decimal column may declare (Decimal128 limit).
pub const MAX_DECIMAL_SCALE: i8 = 38;

/// Runtime representation of a decimal column value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    value: i128,
    scale: i8,
}

impl DecimalValue {
    /// Build a decimal from its scaled integer and the column's scale.
    #[inline]
    pub fn new(value: i128, scale: i8) -> Self {
        debug_assert!((0..=MAX_DECIMAL_SCALE).contains(&scale));
        Self { value, scale }
    }

    /// Integer with zero scale.
    #[inline]
    pub fn from_i64(value: i64) -> Self {
        Self::new(value as i128, 0)
    }

    /// The scaled integer backing this decimal.
    #[inline]
    pub fn raw_value(self) -> i128 {
        self.value
    }

    /// Number of fractional digits.
    #[inline]
    pub fn scale(self) -> i8 {
        self.scale
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let pow = 10i128.pow(self.scale as u32);
        let int = self.value / pow;
        let frac = (self.value % pow).unsigned_abs();
        let sign = if self.value < 0 && int == 0 { "-" } else { "" };
        write!(f, "{sign}{int}.{frac:0width$}", width = self.scale as usize)
    }
}

#[inline]
pub fn encoded_len_decimal(d: DecimalValue) -> usize {
    encoded_len_i128(d.raw_value())
}

#[inline]
pub fn encode_decimal_into(dst: &mut Vec<u8>, d: DecimalValue, descending: bool) {
    encode_i128_into(dst, d.raw_value(), descending);
}

/// Decode a decimal; `scale` comes from the column's schema.
#[inline]
pub fn decode_decimal(
    src: &[u8],
    scale: i8,
    descending: bool,
) -> Result<(DecimalValue, usize), DecodeError> {
    let (v, n) = decode_i128(src, descending)?;
    Ok((DecimalValue::new(v, scale), n))
}
