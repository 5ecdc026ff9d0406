//! The entry filter: drives one row's predicate evaluation against an
//! encoded entry and surfaces surviving column ranges to an accumulator.
//!
//! This is the seam between the scan boundary (raw cells in ascending
//! column-position order) and row materialization: the filter walks the
//! multi-field cursor, computes each present column's byte range, consults
//! the predicate tree (short-circuiting on the first reject), and hands
//! only requested ranges to the [`EntryAccumulator`]. The accumulator
//! implementation lives with the row layer; scans that need nothing
//! decoded plug in a no-op implementation.

use keel_encoding::multi_field::{FieldClass, FieldSpec, MultiFieldDecoder};
use keel_result::{Error, Result};
use roaring::RoaringBitmap;

use crate::predicate::Predicate;

/// Receives (column position, byte range) pairs for the columns a scan
/// asked for. Width-specialized variants exist because fixed 32/64-bit
/// slots are delimited by width, not by separator scan.
pub trait EntryAccumulator {
    fn occupy(&mut self, position: u32, data: &[u8]) -> Result<()>;
    fn occupy_scalar(&mut self, position: u32, data: &[u8]) -> Result<()>;
    fn occupy_float(&mut self, position: u32, data: &[u8]) -> Result<()>;
    fn occupy_double(&mut self, position: u32, data: &[u8]) -> Result<()>;

    /// Whether this column position was requested.
    fn is_interested(&self, position: u32) -> bool;

    /// Whether every requested column has been filled for the current row.
    fn is_finished(&self) -> bool;
}

/// Packages the predicate tree with the set of columns the scan wants
/// returned, and tracks which columns the current row actually presented.
///
/// Like the predicate it wraps, an `EntryFilter` is constructed once per
/// scan and reused row-to-row; [`EntryFilter::reset`] must run between
/// rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFilter {
    predicate: Predicate,
    fields_to_return: RoaringBitmap,
    seen: RoaringBitmap,
}

impl EntryFilter {
    pub fn new(predicate: Predicate, fields_to_return: RoaringBitmap) -> Self {
        Self {
            predicate,
            fields_to_return,
            seen: RoaringBitmap::new(),
        }
    }

    #[inline]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[inline]
    pub fn fields_to_return(&self) -> &RoaringBitmap {
        &self.fields_to_return
    }

    /// Clear per-row state (the predicate's sticky flag and the seen set).
    pub fn reset(&mut self) {
        self.predicate.reset();
        self.seen.clear();
    }

    /// Evaluate one entry. `layout` lists the entry's present fields in
    /// ascending column-position order (the scan boundary contract);
    /// `decoder` is positioned at the entry's first field.
    ///
    /// Returns false as soon as any column range fails the predicate.
    /// Requested columns that survive are handed to `acc` with the
    /// width-appropriate occupy variant.
    pub fn match_entry<A: EntryAccumulator>(
        &mut self,
        decoder: &mut MultiFieldDecoder<'_>,
        layout: &[FieldSpec],
        acc: &mut A,
    ) -> Result<bool> {
        for spec in layout {
            let start = decoder.offset();
            let len = decoder.skip_field(spec.class, spec.descending);
            let end = start + len;
            if end > decoder.data().len() {
                return Err(Error::Corrupt(format!(
                    "entry truncated in column {}",
                    spec.column
                )));
            }
            let range = &decoder.data()[start..end];
            self.seen.insert(spec.column);

            if !self.predicate.matches(spec.column, range) {
                return Ok(false);
            }

            if acc.is_interested(spec.column) {
                match spec.class {
                    FieldClass::Untyped => acc.occupy(spec.column, range)?,
                    FieldClass::Scalar => acc.occupy_scalar(spec.column, range)?,
                    FieldClass::Float => acc.occupy_float(spec.column, range)?,
                    FieldClass::Double => acc.occupy_double(spec.column, range)?,
                }
            }
        }
        Ok(true)
    }

    /// Residual pass over columns the predicate constrains but the row
    /// never presented (absent = null). Returns false when the row must be
    /// rejected after all.
    pub fn check_remaining(&mut self) -> bool {
        if !self.predicate.check_after() {
            return true;
        }
        let mut constrained = RoaringBitmap::new();
        self.predicate.set_checked_columns(&mut constrained);
        for column in &constrained {
            if !self.seen.contains(column) && !self.predicate.matches(column, &[]) {
                return false;
            }
        }
        true
    }

    /// Wire format: `[4-byte BE field count][4-byte BE position]*`
    /// followed by the serialized predicate.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.fields_to_return.len() as u32).to_be_bytes());
        for pos in &self.fields_to_return {
            out.extend_from_slice(&pos.to_be_bytes());
        }
        out.extend_from_slice(&self.predicate.to_bytes());
        out
    }

    pub fn from_bytes(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let count_bytes = data.get(offset..offset + 4).ok_or_else(|| {
            Error::MalformedPredicate("truncated entry-filter field count".into())
        })?;
        let count = u32::from_be_bytes(count_bytes.try_into().unwrap()) as usize;
        let mut pos = offset + 4;
        let mut fields = RoaringBitmap::new();
        for _ in 0..count {
            let b = data.get(pos..pos + 4).ok_or_else(|| {
                Error::MalformedPredicate("truncated entry-filter field list".into())
            })?;
            fields.insert(u32::from_be_bytes(b.try_into().unwrap()));
            pos += 4;
        }
        let (predicate, used) = Predicate::from_bytes(data, pos)?;
        Ok((Self::new(predicate, fields), pos + used - offset))
    }
}
