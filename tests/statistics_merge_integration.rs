//! Statistics accumulators merge the same way in any grouping

use dataprep_rs::analysis::StatisticsAccumulator;
use dataprep_rs::config::StatisticsSettings;
use dataprep_rs::types::{ColumnMetadata, DataType, Row, RowMetadata};
use proptest::prelude::*;

fn schema() -> RowMetadata {
    RowMetadata::new(vec![
        ColumnMetadata::new("0000", "n", DataType::Integer),
        ColumnMetadata::new("0001", "d", DataType::Decimal),
        ColumnMetadata::new("0002", "s", DataType::String),
    ])
}

fn row_strategy() -> impl Strategy<Value = Row> {
    let cell = prop_oneof![
        Just(String::new()),
        "-?[0-9]{1,3}",
        "[0-9]{1,2}\\.[0-9]{1,2}",
        "[a-c]{1,3}",
    ];
    (any::<u64>(), cell.clone(), cell.clone(), cell, any::<bool>()).prop_map(
        |(id, a, b, c, deleted)| {
            let mut row = Row::new(id).with("0000", a).with("0001", b).with("0002", c);
            row.set_deleted(deleted);
            row
        },
    )
}

fn accumulate(rows: &[Row]) -> StatisticsAccumulator {
    let metadata = schema();
    let mut acc = StatisticsAccumulator::new(StatisticsSettings::default());
    for row in rows {
        acc.accept(row, &metadata);
    }
    acc
}

proptest! {
    #[test]
    fn prop_merge_is_commutative(
        left in prop::collection::vec(row_strategy(), 0..20),
        right in prop::collection::vec(row_strategy(), 0..20),
    ) {
        let mut ab = accumulate(&left);
        ab.merge(&accumulate(&right));
        let mut ba = accumulate(&right);
        ba.merge(&accumulate(&left));
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn prop_merge_is_associative(
        a in prop::collection::vec(row_strategy(), 0..15),
        b in prop::collection::vec(row_strategy(), 0..15),
        c in prop::collection::vec(row_strategy(), 0..15),
    ) {
        let mut left = accumulate(&a);
        left.merge(&accumulate(&b));
        left.merge(&accumulate(&c));

        let mut bc = accumulate(&b);
        bc.merge(&accumulate(&c));
        let mut right = accumulate(&a);
        right.merge(&bc);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_any_split_matches_whole(
        rows in prop::collection::vec(row_strategy(), 0..40),
        cut in any::<prop::sample::Index>(),
    ) {
        let at = if rows.is_empty() { 0 } else { cut.index(rows.len() + 1) };
        let mut parts = accumulate(&rows[..at]);
        parts.merge(&accumulate(&rows[at..]));
        prop_assert_eq!(parts, accumulate(&rows));
    }

    #[test]
    fn prop_quality_totals_count_live_rows(rows in prop::collection::vec(row_strategy(), 0..40)) {
        let acc = accumulate(&rows);
        let live = rows.iter().filter(|r| !r.is_deleted()).count() as u64;
        prop_assert_eq!(acc.rows(), live);
        for id in schema().ids() {
            let total = acc.quality(id).map(|q| q.total()).unwrap_or(0);
            prop_assert_eq!(total, live);
        }
    }
}

#[test]
fn test_apply_to_writes_quality() {
    let rows = vec![
        Row::new(1).with("0000", "1").with("0001", "x").with("0002", ""),
        Row::new(2).with("0000", "").with("0001", "2.5").with("0002", "a"),
    ];
    let mut metadata = schema();
    accumulate(&rows).apply_to(&mut metadata);

    let n = &metadata.column("0000").unwrap().quality;
    assert_eq!((n.valid, n.invalid, n.empty), (1, 0, 1));
    let d = &metadata.column("0001").unwrap().quality;
    assert_eq!((d.valid, d.invalid, d.empty), (1, 1, 0));
    let numeric = metadata.column("0001").unwrap().statistics.numeric.unwrap();
    assert_eq!((numeric.min, numeric.max), (2.5, 2.5));
}
