//! Order-preserving row encoding for the keel storage core.
//!
//! Three layers build on each other:
//!
//! 1. **Primitive codecs** ([`scalar`], [`float`], [`text`], [`decimal`]):
//!    per-type `encode_*_into` / `decode_*` / `encoded_len_*` functions
//!    whose output compares bytewise exactly as the values compare
//!    natively. This is the invariant the whole scan path leans on: a
//!    predicate can compare raw stored bytes against an encoded comparand
//!    without decoding either side.
//! 2. **[`ExpandingEncoder`]**: an append-only byte buffer with explicit
//!    geometric growth, used wherever successive typed values are packed
//!    into one array.
//! 3. **[`MultiFieldEncoder`] / [`MultiFieldDecoder`]**: the entry cursor
//!    that packs an ordered field sequence into one contiguous entry and
//!    walks it back selectively (skip-without-decode, offset tracking).
//!
//! Signed integers are transformed before raw encoding (header bias plus
//! per-group mapping) so unsigned lexicographic comparison agrees with
//! signed numeric comparison; the transform is exactly inverted on decode.

pub mod decimal;
pub mod errors;
pub mod expanding;
pub mod float;
pub mod multi_field;
pub mod scalar;
pub mod text;

pub use decimal::DecimalValue;
pub use errors::{DecodeError, EncodeError};
pub use expanding::{ExpandingEncoder, MAX_BUFFER_SIZE};
pub use multi_field::{
    DESC_TEXT_TERMINATOR, FIELD_SEPARATOR, FieldClass, FieldSpec, MultiFieldDecoder,
    MultiFieldEncoder,
};

/// A tag for the logical type stored in a column.
///
/// Cheap to store and copy; its job is to label the storage format so the
/// cursor and serializers can pick the right codec. Decimal columns carry
/// their schema-fixed scale in the tag, since decoding needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Text,
    Decimal { scale: i8 },
}

impl FieldType {
    /// Width class of this type within an encoded entry.
    #[inline]
    pub fn class(self) -> FieldClass {
        match self {
            FieldType::F32 => FieldClass::Float,
            FieldType::F64 => FieldClass::Double,
            FieldType::Text => FieldClass::Untyped,
            _ => FieldClass::Scalar,
        }
    }
}

/// A decoded column value.
///
/// The owning variant set (rather than a borrowed one) exists because the
/// accumulator mutates a long-lived row template in place across millions
/// of rows; `Text` reuses its `String` allocation between rows.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
    Decimal(DecimalValue),
}

impl FieldValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "Null",
            FieldValue::I8(_) => "I8",
            FieldValue::I16(_) => "I16",
            FieldValue::I32(_) => "I32",
            FieldValue::I64(_) => "I64",
            FieldValue::F32(_) => "F32",
            FieldValue::F64(_) => "F64",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Text(_) => "Text",
            FieldValue::Decimal(_) => "Decimal",
        }
    }
}

/// Encode `value` as `ty` into a fresh buffer (no field terminator).
/// Convenience for building predicate comparands.
pub fn encode_value_to_vec(
    value: &FieldValue,
    ty: FieldType,
    descending: bool,
) -> keel_result::Result<Vec<u8>> {
    let mut out = Vec::new();
    match (ty, value) {
        (_, FieldValue::Null) => {}
        (FieldType::I8, FieldValue::I8(x)) => scalar::encode_i8_into(&mut out, *x, descending),
        (FieldType::I16, FieldValue::I16(x)) => scalar::encode_i16_into(&mut out, *x, descending),
        (FieldType::I32, FieldValue::I32(x)) => scalar::encode_i32_into(&mut out, *x, descending),
        (FieldType::I64, FieldValue::I64(x)) => scalar::encode_i64_into(&mut out, *x, descending),
        (FieldType::F32, FieldValue::F32(x)) => float::encode_f32_into(&mut out, *x, descending),
        (FieldType::F64, FieldValue::F64(x)) => float::encode_f64_into(&mut out, *x, descending),
        (FieldType::Bool, FieldValue::Bool(x)) => scalar::encode_bool_into(&mut out, *x, descending),
        (FieldType::Text, FieldValue::Text(s)) => text::encode_str_into(&mut out, s, descending),
        (FieldType::Decimal { .. }, FieldValue::Decimal(d)) => {
            decimal::encode_decimal_into(&mut out, *d, descending)
        }
        (expected, v) => {
            return Err(EncodeError::TypeMismatch {
                expected,
                got: v.kind(),
            }
            .into());
        }
    }
    Ok(out)
}
