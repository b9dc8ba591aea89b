//! Property-based tests for classification, reduction and waste accounting.
//!
//! ## Properties
//!
//! - every column of every storage type receives exactly one category,
//!   consistent with its distinct value count and the state threshold K
//! - K distinct values are a State, K + 1 are a Scalar
//! - scalar reduction is idempotent
//! - the reduced scalar trace redraws the original value at every input time
//!   up to its last point
//! - the boolean encoding always emits the final sample and one change event
//!   per value change
//! - constwaste never exceeds the file size and hits both extremes exactly

use std::collections::BTreeSet;

use proptest::prelude::*;
use tsprofile::aggregate::{summarize_file, FileMetadata};
use tsprofile::classifier::{classify, Category, Classification, ColumnRecord};
use tsprofile::reduce::{reduce_boolean, reduce_scalar, EventKind};
use tsprofile::table::{DataKind, Value};

/// Strictly increasing timestamps with `len` entries.
fn timestamps(len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..500, len).prop_map(|deltas| {
        deltas
            .into_iter()
            .scan(0i64, |t, d| {
                *t += d;
                Some(*t)
            })
            .collect()
    })
}

fn series<T: std::fmt::Debug + Clone>(
    values: impl Strategy<Value = T> + Clone,
) -> impl Strategy<Value = (Vec<i64>, Vec<T>)> {
    (1usize..200).prop_flat_map(move |len| {
        (timestamps(len), prop::collection::vec(values.clone(), len))
    })
}

/// Float drawn for a sample index: `NaN`, `-0.0`, `0.0`, then steps of 0.5.
fn float_sample(i: usize) -> f64 {
    match i {
        0 => f64::NAN,
        1 => -0.0,
        _ => (i - 2) as f64 * 0.5,
    }
}

fn expected_category(distinct: usize, k: usize) -> Category {
    match distinct {
        0 | 1 => Category::Constant,
        d if d <= k => Category::State,
        _ => Category::Scalar,
    }
}

fn record(column: &str, classification: Classification) -> ColumnRecord {
    ColumnRecord {
        file: "f".to_string(),
        column: column.to_string(),
        dtype: DataKind::Integer,
        row_count: 10,
        update_interval: 1.0,
        classification,
    }
}

proptest! {
    #[test]
    fn test_classification_is_total(
        raw in prop::collection::vec(prop::option::of(0i64..12), 0..100),
        k in 2usize..10,
    ) {
        let values: Vec<Value> = raw.iter().map(|v| v.map_or(Value::Null, Value::Integer)).collect();
        let distinct: BTreeSet<i64> = raw.iter().flatten().copied().collect();

        let category = classify(&values, DataKind::Integer, k).category();
        prop_assert_eq!(category, expected_category(distinct.len(), k));
    }

    #[test]
    fn test_float_classification_is_total(
        raw in prop::collection::vec(prop::option::of(0usize..10), 0..100),
        k in 2usize..10,
    ) {
        let values: Vec<Value> = raw
            .iter()
            .map(|i| i.map_or(Value::Null, |i| Value::float(float_sample(i))))
            .collect();
        // NaN reads as missing and -0.0 as 0.0
        let distinct: BTreeSet<usize> = raw
            .iter()
            .flatten()
            .filter(|i| **i != 0)
            .map(|i| if *i == 1 { 2 } else { *i })
            .collect();

        let category = classify(&values, DataKind::Float, k).category();
        prop_assert_eq!(category, expected_category(distinct.len(), k));
    }

    #[test]
    fn test_text_classification_is_total(
        raw in prop::collection::vec(prop::option::of("[a-h]"), 0..100),
        k in 2usize..10,
    ) {
        let values: Vec<Value> = raw
            .iter()
            .map(|s| s.clone().map_or(Value::Null, Value::Text))
            .collect();
        let distinct: BTreeSet<&String> = raw.iter().flatten().collect();

        let category = classify(&values, DataKind::Other, k).category();
        prop_assert_eq!(category, expected_category(distinct.len(), k));
    }

    #[test]
    fn test_boolean_classification_is_total(
        raw in prop::collection::vec(prop::option::of(any::<bool>()), 0..100),
        k in 2usize..10,
    ) {
        let values: Vec<Value> = raw.iter().map(|v| v.map_or(Value::Null, Value::Boolean)).collect();
        let distinct: BTreeSet<bool> = raw.iter().flatten().copied().collect();

        match classify(&values, DataKind::Boolean, k) {
            Classification::Boolean { true_count, false_count, .. } => {
                prop_assert_eq!(distinct.len(), 2);
                prop_assert_eq!(true_count, raw.iter().filter(|v| **v == Some(true)).count() as u64);
                prop_assert_eq!(false_count, raw.iter().filter(|v| **v == Some(false)).count() as u64);
            }
            other => {
                prop_assert!(distinct.len() <= 1);
                prop_assert_eq!(other.category(), Category::Constant);
            }
        }
    }

    #[test]
    fn test_state_scalar_boundary(k in 2usize..12, repeats in 1usize..5) {
        let column = |distinct: usize| -> Vec<Value> {
            (0..distinct * repeats).map(|i| Value::Integer((i % distinct) as i64)).collect()
        };

        prop_assert_eq!(classify(&column(k), DataKind::Integer, k).category(), Category::State);
        prop_assert_eq!(classify(&column(k + 1), DataKind::Integer, k).category(), Category::Scalar);
    }

    #[test]
    fn test_state_transitions_cover_every_pair(
        raw in prop::collection::vec(0i64..4, 2..100),
    ) {
        let values: Vec<Value> = raw.iter().copied().map(Value::Integer).collect();
        if let Classification::State { transition_counts, value_counts, .. } =
            classify(&values, DataKind::Integer, 6)
        {
            let transitions: u64 = transition_counts.iter().map(|t| t.count).sum();
            let occurrences: u64 = value_counts.iter().map(|v| v.count).sum();
            prop_assert_eq!(transitions, raw.len() as u64 - 1);
            prop_assert_eq!(occurrences, raw.len() as u64);
        }
    }

    #[test]
    fn test_scalar_reduction_idempotent((times, values) in series(0i64..4)) {
        let once = reduce_scalar(&times, &values).unwrap();
        let t: Vec<i64> = once.iter().map(|p| p.time).collect();
        let v: Vec<i64> = once.iter().map(|p| p.value).collect();
        let twice = reduce_scalar(&t, &v).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_scalar_reduction_redraws_original((times, values) in series(0i64..4)) {
        let points = reduce_scalar(&times, &values).unwrap();
        prop_assert_eq!(points[0].time, times[0]);
        let last = points.last().unwrap();

        for (t, v) in times.iter().zip(&values) {
            // the trailing run is left open, so samples past the last point repeat it
            if *t > last.time {
                prop_assert_eq!(*v, last.value);
                continue;
            }
            let j = points.iter().rposition(|p| p.time <= *t).unwrap();
            let drawn = match points.get(j + 1) {
                Some(next) if points[j].time != *t => {
                    let (t0, t1) = (points[j].time as f64, next.time as f64);
                    let (v0, v1) = (points[j].value as f64, next.value as f64);
                    v0 + (v1 - v0) * (*t as f64 - t0) / (t1 - t0)
                }
                _ => points[j].value as f64,
            };
            prop_assert_eq!(drawn, *v as f64);
        }
    }

    #[test]
    fn test_boolean_closure((times, values) in series(any::<bool>())) {
        let events = reduce_boolean("flag", &times, &values, -1.0).unwrap();

        prop_assert_eq!(events[0].kind, EventKind::Start);
        let last = events.last().unwrap();
        prop_assert_eq!(last.time, *times.last().unwrap());
        prop_assert_eq!(last.value, *values.last().unwrap());

        let changes = values.windows(2).filter(|w| w[0] != w[1]).count();
        let change_events = events.iter().filter(|e| e.kind == EventKind::Change).count();
        prop_assert_eq!(change_events, changes);

        for event in &events {
            prop_assert!(event.true_lane().is_some() != event.false_lane().is_some());
        }
    }

    #[test]
    fn test_constwaste_bounds(
        constants in 0usize..10,
        others in 0usize..10,
        size in 0u64..10_000_000,
    ) {
        prop_assume!(constants + others > 0);

        let mut records = Vec::new();
        for i in 0..constants {
            records.push(record(&format!("c{i}"), Classification::Constant { value: Value::Integer(0) }));
        }
        for i in 0..others {
            records.push(record(&format!("b{i}"), Classification::Boolean {
                true_count: 1,
                false_count: 1,
                change_count: 1,
            }));
        }

        let meta = FileMetadata {
            file: "f".to_string(),
            size_bytes: size,
            row_count: 2,
            field_count: 2 * (records.len() as u64 + 1),
            update_interval: 1.0,
        };
        let summary = summarize_file(&meta, &records).unwrap();

        prop_assert!(summary.constwaste <= size);
        if others == 0 {
            prop_assert_eq!(summary.constwaste, size);
        }
        if constants == 0 {
            prop_assert_eq!(summary.constwaste, 0);
        }
    }
}
