//! The caller-supplied typed row container.

use keel_encoding::FieldValue;

/// A fixed-width row of decoded column values.
///
/// The execution engine allocates one template per scan and hands the
/// accumulator a mutable borrow; decoded values land in place and the
/// template is never reallocated on the decode path. `Text` slots reuse
/// their `String` allocation between rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    values: Vec<FieldValue>,
}

impl TypedRow {
    /// A row of `width` null slots.
    pub fn new(width: usize) -> Self {
        Self {
            values: vec![FieldValue::Null; width],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn value(&self, slot: usize) -> &FieldValue {
        &self.values[slot]
    }

    #[inline]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    #[inline]
    pub fn slot_mut(&mut self, slot: usize) -> &mut FieldValue {
        &mut self.values[slot]
    }

    /// Null out every slot. Text allocations are kept for reuse only when
    /// the next decode writes text again, so this is a plain overwrite.
    pub fn clear_to_null(&mut self) {
        for v in &mut self.values {
            *v = FieldValue::Null;
        }
    }
}
