//! End-to-end scan behavior: entries encoded field-by-field, filtered on
//! raw bytes, and selectively materialized into a reused row template.

use keel_encoding::multi_field::{FieldClass, FieldSpec, MultiFieldDecoder, MultiFieldEncoder};
use keel_encoding::{DecimalValue, FieldType, FieldValue, encode_value_to_vec};
use keel_filter::{CompareOp, EntryFilter, Predicate};
use keel_row::{FormatVersion, RowAccumulator, SerializerCache, TypedRow, VersionedSerializers};
use roaring::RoaringBitmap;

const SHAPE: &[FieldType] = &[
    FieldType::I64,
    FieldType::Text,
    FieldType::F64,
    FieldType::Decimal { scale: 2 },
];

fn layout() -> Vec<FieldSpec> {
    vec![
        FieldSpec::ascending(0, FieldClass::Scalar),
        FieldSpec::ascending(1, FieldClass::Untyped),
        FieldSpec::ascending(2, FieldClass::Double),
        FieldSpec::ascending(3, FieldClass::Scalar),
    ]
}

fn encode_row(id: i64, name: &str, weight: f64, price_cents: i128) -> Vec<u8> {
    let mut enc = MultiFieldEncoder::new(4);
    enc.encode_next_i64(id).unwrap();
    enc.encode_next_str(name).unwrap();
    enc.encode_next_f64(weight).unwrap();
    enc.encode_next(
        FieldType::Decimal { scale: 2 },
        &FieldValue::Decimal(DecimalValue::new(price_cents, 2)),
        false,
    )
    .unwrap();
    enc.build().unwrap()
}

fn fields(positions: &[u32]) -> RoaringBitmap {
    let mut b = RoaringBitmap::new();
    for p in positions {
        b.insert(*p);
    }
    b
}

#[test]
fn scan_filters_and_materializes_requested_columns() {
    let rows = [
        encode_row(5, "anchor", 1.5, 199),
        encode_row(20, "bollard", 3.25, 450),
        encode_row(30, "capstan", 0.5, 125),
    ];

    // id > 10, materialize name and price only.
    let comparand = encode_value_to_vec(&FieldValue::I64(10), FieldType::I64, false).unwrap();
    let predicate = Predicate::value(CompareOp::Greater, 0, comparand, true, false);
    let filter = EntryFilter::new(predicate, fields(&[1, 3]));

    let serializers = VersionedSerializers::latest(SHAPE).instantiate();
    let mut row = TypedRow::new(4);
    let mut acc = RowAccumulator::new(
        filter,
        &mut row,
        vec![Some(0), Some(1), Some(2), Some(3)],
        None,
        serializers,
    )
    .unwrap();
    assert!(!acc.is_noop());

    let mut kept: Vec<(String, i128)> = Vec::new();
    for entry in &rows {
        acc.reset();
        let mut dec = MultiFieldDecoder::wrap(entry);
        if acc.match_entry(&mut dec, &layout()).unwrap() && acc.finish() {
            let r = acc.row().unwrap();
            let name = match r.value(1) {
                FieldValue::Text(s) => s.clone(),
                other => panic!("expected text, got {other:?}"),
            };
            let price = match r.value(3) {
                FieldValue::Decimal(d) => d.raw_value(),
                other => panic!("expected decimal, got {other:?}"),
            };
            // Unrequested columns are never decoded.
            assert!(r.value(0).is_null());
            assert!(r.value(2).is_null());
            kept.push((name, price));
        }
    }
    acc.close();

    assert_eq!(
        kept,
        vec![("bollard".to_string(), 450), ("capstan".to_string(), 125)]
    );
}

#[test]
fn forgetting_reset_poisons_subsequent_rows() {
    let rows = [
        encode_row(1, "reject-me", 0.0, 0),
        encode_row(99, "would-match", 0.0, 0),
    ];
    let comparand = encode_value_to_vec(&FieldValue::I64(50), FieldType::I64, false).unwrap();
    let predicate = Predicate::and(vec![
        Predicate::value(CompareOp::Greater, 0, comparand.clone(), true, false),
        Predicate::value(CompareOp::NotEqual, 3, Vec::new(), false, false),
    ]);
    let mut filter = EntryFilter::new(predicate, fields(&[]));

    struct Nothing;
    impl keel_filter::EntryAccumulator for Nothing {
        fn occupy(&mut self, _: u32, _: &[u8]) -> keel_result::Result<()> {
            Ok(())
        }
        fn occupy_scalar(&mut self, _: u32, _: &[u8]) -> keel_result::Result<()> {
            Ok(())
        }
        fn occupy_float(&mut self, _: u32, _: &[u8]) -> keel_result::Result<()> {
            Ok(())
        }
        fn occupy_double(&mut self, _: u32, _: &[u8]) -> keel_result::Result<()> {
            Ok(())
        }
        fn is_interested(&self, _: u32) -> bool {
            false
        }
        fn is_finished(&self) -> bool {
            true
        }
    }

    let mut acc = Nothing;
    let mut dec = MultiFieldDecoder::wrap(&rows[0]);
    assert!(!filter.match_entry(&mut dec, &layout(), &mut acc).unwrap());

    // No reset: the sticky failure silently rejects a row that matches.
    let mut dec = MultiFieldDecoder::wrap(&rows[1]);
    assert!(!filter.match_entry(&mut dec, &layout(), &mut acc).unwrap());

    // With the reset the same row passes.
    filter.reset();
    let mut dec = MultiFieldDecoder::wrap(&rows[1]);
    assert!(filter.match_entry(&mut dec, &layout(), &mut acc).unwrap());
}

#[test]
fn zero_column_scan_uses_noop_and_still_filters() {
    let comparand = encode_value_to_vec(&FieldValue::Text("bollard".into()), FieldType::Text, false)
        .unwrap();
    let predicate = Predicate::value(CompareOp::Equal, 1, comparand, true, false);
    let filter = EntryFilter::new(predicate, fields(&[]));

    let serializers = VersionedSerializers::latest(SHAPE).instantiate();
    let mut row = TypedRow::new(4);
    let mut acc = RowAccumulator::new(
        filter,
        &mut row,
        vec![Some(0), Some(1), Some(2), Some(3)],
        None,
        serializers,
    )
    .unwrap();
    assert!(acc.is_noop());
    assert!(acc.is_finished());

    let hit = encode_row(20, "bollard", 3.25, 450);
    let miss = encode_row(30, "capstan", 0.5, 125);

    let mut dec = MultiFieldDecoder::wrap(&hit);
    assert!(acc.match_entry(&mut dec, &layout()).unwrap());
    assert!(acc.finish());

    acc.reset();
    let mut dec = MultiFieldDecoder::wrap(&miss);
    assert!(!acc.match_entry(&mut dec, &layout()).unwrap());
    acc.close();
}

#[test]
fn descending_columns_decode_through_sort_order_flags() {
    // Column 0 written descending; comparand stays ascending-encoded.
    let mut enc = MultiFieldEncoder::new(2);
    enc.encode_next(FieldType::I64, &FieldValue::I64(42), true)
        .unwrap();
    enc.encode_next_str("rudder").unwrap();
    let entry = enc.build().unwrap();

    let layout = vec![
        FieldSpec {
            column: 0,
            class: FieldClass::Scalar,
            descending: true,
        },
        FieldSpec::ascending(1, FieldClass::Untyped),
    ];

    let comparand = encode_value_to_vec(&FieldValue::I64(42), FieldType::I64, false).unwrap();
    let predicate = Predicate::value(CompareOp::Equal, 0, comparand, true, true);
    let filter = EntryFilter::new(predicate, fields(&[0, 1]));

    let shape = &[FieldType::I64, FieldType::Text];
    let serializers = VersionedSerializers::latest(shape).instantiate();
    let mut row = TypedRow::new(2);
    let mut acc = RowAccumulator::new(
        filter,
        &mut row,
        vec![Some(0), Some(1)],
        Some(vec![true, false]),
        serializers,
    )
    .unwrap();

    let mut dec = MultiFieldDecoder::wrap(&entry);
    assert!(acc.match_entry(&mut dec, &layout).unwrap());
    assert!(acc.finish());
    let r = acc.row().unwrap();
    assert_eq!(r.value(0), &FieldValue::I64(42));
    assert_eq!(r.value(1), &FieldValue::Text("rudder".into()));
    assert_eq!(acc.get_current_length(1), "rudder".len());
    acc.close();
}

#[test]
fn legacy_version_decodes_old_decimal_entries() {
    // A version-1.0 table stored its decimal in an 8-byte float slot.
    let shape = &[FieldType::Decimal { scale: 2 }];
    let mut cache = SerializerCache::new(8);

    let mut v1_writers = cache.get(FormatVersion::V1, shape).instantiate();
    let mut enc = MultiFieldEncoder::new(1);
    v1_writers[0]
        .encode_next(
            &mut enc,
            &FieldValue::Decimal(DecimalValue::new(12345, 2)),
            false,
        )
        .unwrap();
    let legacy_entry = enc.build().unwrap();

    let filter = EntryFilter::new(
        Predicate::value(CompareOp::Equal, u32::MAX, Vec::new(), false, false),
        fields(&[0]),
    );
    let mut row = TypedRow::new(1);
    let mut acc = RowAccumulator::new(
        filter,
        &mut row,
        vec![Some(0)],
        None,
        cache.get(FormatVersion::V1, shape).instantiate(),
    )
    .unwrap();

    // Legacy decimals live in a Double-class slot.
    let layout = vec![FieldSpec::ascending(0, FieldClass::Double)];
    let mut dec = MultiFieldDecoder::wrap(&legacy_entry);
    assert!(acc.match_entry(&mut dec, &layout).unwrap());
    assert!(acc.finish());
    assert_eq!(
        acc.row().unwrap().value(0),
        &FieldValue::Decimal(DecimalValue::new(12345, 2))
    );
    acc.close();
}

#[test]
fn residual_check_after_rejects_rows_missing_required_columns() {
    // Predicate demands column 5 (remove_nulls); the entries never carry
    // a sixth column, so every row must be rejected at finish().
    let comparand = encode_value_to_vec(&FieldValue::I64(1), FieldType::I64, false).unwrap();
    let predicate = Predicate::value(CompareOp::Equal, 5, comparand, true, false);
    let filter = EntryFilter::new(predicate, fields(&[1]));

    let serializers = VersionedSerializers::latest(SHAPE).instantiate();
    let mut row = TypedRow::new(4);
    let mut acc = RowAccumulator::new(
        filter,
        &mut row,
        vec![Some(0), Some(1), Some(2), Some(3)],
        None,
        serializers,
    )
    .unwrap();

    let entry = encode_row(1, "anchor", 1.0, 100);
    let mut dec = MultiFieldDecoder::wrap(&entry);
    assert!(acc.match_entry(&mut dec, &layout()).unwrap());
    assert!(!acc.finish(), "absent constrained column rejects the row");
    acc.close();
}
