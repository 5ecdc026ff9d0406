//! The column accumulator: consumes (column position, byte range) pairs
//! surfaced by predicate evaluation and selectively decodes only the
//! requested columns into a caller-supplied [`TypedRow`].
//!
//! One accumulator is constructed per scan, bound to a fixed row shape and
//! column map, and mutated once per row. Like the predicate it wraps, it
//! must be [`RowAccumulator::reset`] between rows; [`RowAccumulator::close`]
//! releases every per-column serializer and must run on every exit path
//! (a `Drop` backstop closes anything left open, logging the oversight).

use keel_encoding::multi_field::{FieldSpec, MultiFieldDecoder};
use keel_filter::{EntryAccumulator, EntryFilter};
use keel_result::{Error, Result};
use roaring::RoaringBitmap;

use crate::row::TypedRow;
use crate::serializer::FieldSerializer;

/// Accumulates one scan's requested columns into a typed row template.
pub struct RowAccumulator<'a> {
    filter: EntryFilter,
    body: Body<'a>,
}

impl std::fmt::Debug for RowAccumulator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowAccumulator")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

enum Body<'a> {
    Active(FieldsAccumulator<'a>),
    /// Allocation-free variant for scans that request zero columns
    /// (pure-existence scans): every mutating operation is a no-op and it
    /// reports itself permanently finished.
    Noop(NoopAccumulator),
}

impl<'a> RowAccumulator<'a> {
    /// Bind an accumulator to a scan.
    ///
    /// `column_map` maps scan-order positions to row slots (`None` for
    /// positions the row shape does not carry); `sort_order`, when
    /// present, flags descending scan positions; `serializers` holds one
    /// serializer per row slot. When the filter requests no mapped
    /// columns the no-op variant is returned and no serializer is ever
    /// invoked.
    pub fn new(
        filter: EntryFilter,
        row: &'a mut TypedRow,
        column_map: Vec<Option<usize>>,
        sort_order: Option<Vec<bool>>,
        serializers: Vec<Box<dyn FieldSerializer>>,
    ) -> Result<RowAccumulator<'a>> {
        if serializers.len() != row.width() {
            return Err(Error::InvalidArgumentError(format!(
                "{} serializers for a row of width {}",
                serializers.len(),
                row.width()
            )));
        }
        if let Some(slot) = column_map.iter().flatten().find(|s| **s >= row.width()) {
            return Err(Error::InvalidArgumentError(format!(
                "column map slot {slot} outside row of width {}",
                row.width()
            )));
        }
        if let Some(so) = &sort_order {
            if so.len() != column_map.len() {
                return Err(Error::InvalidArgumentError(
                    "sort order and column map lengths differ".into(),
                ));
            }
        }

        let mut fields_to_collect = RoaringBitmap::new();
        for (pos, slot) in column_map.iter().enumerate() {
            if slot.is_some() && filter.fields_to_return().contains(pos as u32) {
                fields_to_collect.insert(pos as u32);
            }
        }

        if fields_to_collect.is_empty() {
            return Ok(RowAccumulator {
                filter,
                body: Body::Noop(NoopAccumulator),
            });
        }

        let column_lengths = vec![0usize; row.width()];
        Ok(RowAccumulator {
            filter,
            body: Body::Active(FieldsAccumulator {
                row,
                serializers,
                column_map,
                sort_order,
                column_lengths,
                fields_to_collect,
                occupied: RoaringBitmap::new(),
                matched: 0,
                closed: false,
            }),
        })
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        matches!(self.body, Body::Noop(_))
    }

    /// Evaluate one entry through the filter, decoding surviving
    /// requested columns in place. Returns false when the predicate
    /// rejects the row.
    pub fn match_entry(
        &mut self,
        decoder: &mut MultiFieldDecoder<'_>,
        layout: &[FieldSpec],
    ) -> Result<bool> {
        match &mut self.body {
            Body::Active(fields) => self.filter.match_entry(decoder, layout, fields),
            Body::Noop(noop) => self.filter.match_entry(decoder, layout, noop),
        }
    }

    /// Residual (`check_after`) validation for columns the predicate
    /// constrains but the row never presented. Returns false when the row
    /// is rejected after all; a surviving row returns only this marker —
    /// the decoded values live in the caller's row template.
    pub fn finish(&mut self) -> bool {
        self.filter.check_remaining()
    }

    /// Whether every requested column has been filled for the current
    /// row. The no-op variant is permanently finished.
    pub fn is_finished(&self) -> bool {
        match &self.body {
            Body::Active(f) => f.is_finished(),
            Body::Noop(n) => n.is_finished(),
        }
    }

    /// Clear per-row state (sticky predicate flag, seen/occupied sets).
    /// Decoded slots are left as-is and overwritten by the next row;
    /// callers that must observe nulls for absent columns clear the
    /// template themselves.
    pub fn reset(&mut self) {
        self.filter.reset();
        if let Body::Active(f) = &mut self.body {
            f.occupied.clear();
            f.matched = 0;
        }
    }

    /// How many raw bytes the column at `scan_position` occupied in the
    /// current row (0 when absent or not requested).
    pub fn get_current_length(&self, scan_position: u32) -> usize {
        match &self.body {
            Body::Active(f) => f
                .column_map
                .get(scan_position as usize)
                .copied()
                .flatten()
                .map_or(0, |slot| f.column_lengths[slot]),
            Body::Noop(_) => 0,
        }
    }

    /// Requested columns decoded for the current row.
    pub fn matched_count(&self) -> u64 {
        match &self.body {
            Body::Active(f) => f.matched,
            Body::Noop(_) => 0,
        }
    }

    /// Read access to the row template being filled.
    pub fn row(&self) -> Option<&TypedRow> {
        match &self.body {
            Body::Active(f) => Some(f.row),
            Body::Noop(_) => None,
        }
    }

    /// Release every per-column serializer. Individual failures are
    /// logged and skipped so one serializer cannot prevent releasing the
    /// rest; this must run on every exit path, including error ones.
    pub fn close(&mut self) {
        if let Body::Active(f) = &mut self.body {
            f.close_all();
        }
    }
}

struct FieldsAccumulator<'a> {
    row: &'a mut TypedRow,
    serializers: Vec<Box<dyn FieldSerializer>>,
    column_map: Vec<Option<usize>>,
    sort_order: Option<Vec<bool>>,
    column_lengths: Vec<usize>,
    fields_to_collect: RoaringBitmap,
    occupied: RoaringBitmap,
    matched: u64,
    closed: bool,
}

impl FieldsAccumulator<'_> {
    fn fill(&mut self, position: u32, data: &[u8]) -> Result<()> {
        let slot = self
            .column_map
            .get(position as usize)
            .copied()
            .flatten()
            .ok_or_else(|| {
                Error::Internal(format!("no row slot mapped for scan position {position}"))
            })?;
        let descending = self
            .sort_order
            .as_ref()
            .is_some_and(|so| so[position as usize]);

        self.serializers[slot].decode_into(self.row.slot_mut(slot), data, descending)?;
        self.column_lengths[slot] = data.len();
        self.occupied.insert(position);
        self.matched += 1;
        Ok(())
    }

    fn close_all(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for (slot, serializer) in self.serializers.iter_mut().enumerate() {
            if let Err(e) = serializer.close() {
                tracing::warn!(slot, error = %e, "field serializer close failed; continuing");
            }
        }
    }
}

impl EntryAccumulator for FieldsAccumulator<'_> {
    fn occupy(&mut self, position: u32, data: &[u8]) -> Result<()> {
        self.fill(position, data)
    }

    fn occupy_scalar(&mut self, position: u32, data: &[u8]) -> Result<()> {
        self.fill(position, data)
    }

    fn occupy_float(&mut self, position: u32, data: &[u8]) -> Result<()> {
        self.fill(position, data)
    }

    fn occupy_double(&mut self, position: u32, data: &[u8]) -> Result<()> {
        self.fill(position, data)
    }

    fn is_interested(&self, position: u32) -> bool {
        self.fields_to_collect.contains(position)
    }

    fn is_finished(&self) -> bool {
        self.occupied.len() == self.fields_to_collect.len()
    }
}

impl Drop for FieldsAccumulator<'_> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("row accumulator dropped without close(); releasing serializers");
            self.close_all();
        }
    }
}

struct NoopAccumulator;

impl EntryAccumulator for NoopAccumulator {
    fn occupy(&mut self, _position: u32, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    fn occupy_scalar(&mut self, _position: u32, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    fn occupy_float(&mut self, _position: u32, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    fn occupy_double(&mut self, _position: u32, _data: &[u8]) -> Result<()> {
        Ok(())
    }
    fn is_interested(&self, _position: u32) -> bool {
        false
    }
    fn is_finished(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_encoding::multi_field::MultiFieldEncoder;
    use keel_encoding::{FieldType, FieldValue};
    use keel_filter::{CompareOp, Predicate};
    use std::cell::Cell;
    use std::rc::Rc;

    fn pass_all_filter(fields: &[u32]) -> EntryFilter {
        let mut bitmap = RoaringBitmap::new();
        for f in fields {
            bitmap.insert(*f);
        }
        // A predicate on no real column never constrains anything.
        EntryFilter::new(
            Predicate::value(CompareOp::Equal, u32::MAX, Vec::new(), false, false),
            bitmap,
        )
    }

    #[test]
    fn zero_requested_columns_selects_noop() {
        let mut row = TypedRow::new(2);
        let acc = RowAccumulator::new(
            pass_all_filter(&[]),
            &mut row,
            vec![Some(0), Some(1)],
            None,
            vec![
                Box::new(crate::serializer::ScalarSerializer::new(FieldType::I64)),
                Box::new(crate::serializer::TextSerializer),
            ],
        )
        .unwrap();
        assert!(acc.is_noop());
        assert!(acc.is_finished());
        assert_eq!(acc.get_current_length(0), 0);
    }

    #[test]
    fn occupy_decodes_into_mapped_slot() {
        let mut row = TypedRow::new(2);
        {
            let mut acc = RowAccumulator::new(
                pass_all_filter(&[0, 1]),
                &mut row,
                vec![Some(1), Some(0)], // scan position 0 -> slot 1
                None,
                vec![
                    Box::new(crate::serializer::TextSerializer),
                    Box::new(crate::serializer::ScalarSerializer::new(FieldType::I64)),
                ],
            )
            .unwrap();

            let mut enc = MultiFieldEncoder::new(1);
            enc.encode_next_i64(33).unwrap();
            let entry = enc.build().unwrap();
            let range = &entry[..entry.len() - 1];

            match &mut acc.body {
                Body::Active(f) => {
                    f.occupy_scalar(0, range).unwrap();
                    assert!(!f.is_finished());
                }
                Body::Noop(_) => panic!("expected active accumulator"),
            }
            assert_eq!(acc.get_current_length(0), range.len());
            assert_eq!(acc.matched_count(), 1);
            acc.close();
        }
        assert_eq!(row.value(1), &FieldValue::I64(33));
        assert!(row.value(0).is_null());
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        let mut row = TypedRow::new(1);
        let err = RowAccumulator::new(
            pass_all_filter(&[0]),
            &mut row,
            vec![Some(3)],
            None,
            vec![Box::new(crate::serializer::TextSerializer)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgumentError(_)));
    }

    /// One serializer failing to close must not stop the others from
    /// being released.
    #[test]
    fn close_releases_all_despite_failure() {
        struct TrackingSerializer {
            fail: bool,
            closed: Rc<Cell<bool>>,
        }
        impl FieldSerializer for TrackingSerializer {
            fn decode_into(
                &mut self,
                _dest: &mut FieldValue,
                _data: &[u8],
                _descending: bool,
            ) -> Result<()> {
                Ok(())
            }
            fn encode_next(
                &mut self,
                _enc: &mut MultiFieldEncoder,
                _value: &FieldValue,
                _descending: bool,
            ) -> Result<()> {
                Ok(())
            }
            fn close(&mut self) -> Result<()> {
                self.closed.set(true);
                if self.fail {
                    return Err(Error::Io(std::io::Error::other("release failed")));
                }
                Ok(())
            }
        }

        let first = Rc::new(Cell::new(false));
        let second = Rc::new(Cell::new(false));
        let mut row = TypedRow::new(2);
        let mut acc = RowAccumulator::new(
            pass_all_filter(&[0, 1]),
            &mut row,
            vec![Some(0), Some(1)],
            None,
            vec![
                Box::new(TrackingSerializer {
                    fail: true,
                    closed: Rc::clone(&first),
                }),
                Box::new(TrackingSerializer {
                    fail: false,
                    closed: Rc::clone(&second),
                }),
            ],
        )
        .unwrap();

        acc.close();
        assert!(first.get());
        assert!(second.get(), "second serializer released despite failure");
    }
}
