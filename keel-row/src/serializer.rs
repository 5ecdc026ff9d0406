//! Per-type field serializers.
//!
//! A serializer owns the byte-level knowledge for one column: how to
//! decode a raw range (honoring the column's sort order) into the row
//! template, and how to write a typed value back out as an entry field.
//! Serializer instances belong to exactly one scan; `close()` releases
//! whatever they hold and must run on every exit path.

use keel_encoding::multi_field::MultiFieldEncoder;
use keel_encoding::{DecimalValue, FieldType, FieldValue, decimal, float, scalar, text};
use keel_result::{Error, Result};

/// Converts between raw encoded bytes and one column's typed value.
///
/// `decode_into` treats a zero-length range as null. `descending` is set
/// when the column was written in descending order; the serializer undoes
/// the order-preservation transform accordingly.
pub trait FieldSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()>;

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()>;

    /// Release per-scan resources. Idempotent; failures are reported but
    /// must leave the serializer safe to drop.
    fn close(&mut self) -> Result<()>;
}

/// Serializer for the variable-length scalar types (integers and bool).
pub struct ScalarSerializer {
    ty: FieldType,
}

impl ScalarSerializer {
    pub fn new(ty: FieldType) -> Self {
        debug_assert!(matches!(
            ty,
            FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 | FieldType::Bool
        ));
        Self { ty }
    }
}

impl FieldSerializer for ScalarSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        if data.is_empty() {
            *dest = FieldValue::Null;
            return Ok(());
        }
        *dest = match self.ty {
            FieldType::I8 => FieldValue::I8(scalar::decode_i8(data, descending)?.0),
            FieldType::I16 => FieldValue::I16(scalar::decode_i16(data, descending)?.0),
            FieldType::I32 => FieldValue::I32(scalar::decode_i32(data, descending)?.0),
            FieldType::I64 => FieldValue::I64(scalar::decode_i64(data, descending)?.0),
            FieldType::Bool => FieldValue::Bool(scalar::decode_bool(data, descending)?.0),
            other => {
                return Err(Error::Internal(format!(
                    "scalar serializer bound to non-scalar type {other:?}"
                )));
            }
        };
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        enc.encode_next(self.ty, value, descending)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Serializer for fixed 4-byte float slots.
pub struct FloatSerializer;

impl FieldSerializer for FloatSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        *dest = if data.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::F32(float::decode_f32(data, descending)?.0)
        };
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        enc.encode_next(FieldType::F32, value, descending)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Serializer for fixed 8-byte float slots.
pub struct DoubleSerializer;

impl FieldSerializer for DoubleSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        *dest = if data.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::F64(float::decode_f64(data, descending)?.0)
        };
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        enc.encode_next(FieldType::F64, value, descending)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Serializer for text columns. Reuses the destination slot's `String`
/// allocation when consecutive rows are both text.
pub struct TextSerializer;

impl FieldSerializer for TextSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        if data.is_empty() {
            *dest = FieldValue::Null;
            return Ok(());
        }
        if let FieldValue::Text(existing) = dest {
            text::decode_str_into(existing, data, descending)?;
        } else {
            *dest = FieldValue::Text(text::decode_str(data, descending)?);
        }
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        enc.encode_next(FieldType::Text, value, descending)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Current decimal serializer: the scaled i128 scalar form.
pub struct DecimalSerializer {
    scale: i8,
}

impl DecimalSerializer {
    pub fn new(scale: i8) -> Self {
        Self { scale }
    }
}

impl FieldSerializer for DecimalSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        *dest = if data.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Decimal(decimal::decode_decimal(data, self.scale, descending)?.0)
        };
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        enc.encode_next(FieldType::Decimal { scale: self.scale }, value, descending)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Legacy (format version 1.0) decimal serializer: columns written before
/// the scaled-integer form stored decimals in an 8-byte float slot.
pub struct LegacyDecimalSerializer {
    scale: i8,
}

impl LegacyDecimalSerializer {
    pub fn new(scale: i8) -> Self {
        Self { scale }
    }

    #[inline]
    fn pow10(&self) -> f64 {
        10f64.powi(self.scale as i32)
    }
}

impl FieldSerializer for LegacyDecimalSerializer {
    fn decode_into(&mut self, dest: &mut FieldValue, data: &[u8], descending: bool) -> Result<()> {
        if data.is_empty() {
            *dest = FieldValue::Null;
            return Ok(());
        }
        let (f, _) = float::decode_f64(data, descending)?;
        let scaled = (f * self.pow10()).round();
        if !scaled.is_finite() {
            return Err(Error::Corrupt(format!(
                "legacy decimal value {f} does not fit scale {}",
                self.scale
            )));
        }
        *dest = FieldValue::Decimal(DecimalValue::new(scaled as i128, self.scale));
        Ok(())
    }

    fn encode_next(
        &mut self,
        enc: &mut MultiFieldEncoder,
        value: &FieldValue,
        descending: bool,
    ) -> Result<()> {
        match value {
            FieldValue::Null => {
                enc.encode_next(FieldType::F64, &FieldValue::Null, descending)?;
            }
            FieldValue::Decimal(d) => {
                let f = d.raw_value() as f64 / self.pow10();
                enc.encode_next(FieldType::F64, &FieldValue::F64(f), descending)?;
            }
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "legacy decimal serializer cannot encode {}",
                    other.kind()
                )));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
