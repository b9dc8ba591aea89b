//! Behavioral classification of signal columns.
//!
//! Every column lands in exactly one of four categories, decided only by its
//! number of distinct (non-null) values and its storage kind:
//!
//! | distinct values `d`      | kind        | category   |
//! |--------------------------|-------------|------------|
//! | `d <= 1`                 | any         | `Constant` |
//! | `d == 2`                 | boolean     | `Boolean`  |
//! | `2 <= d <= K`            | non-boolean | `State`    |
//! | `d > K`                  | non-boolean | `Scalar`   |
//!
//! `K` is the state threshold (6 by default). The column name never affects the
//! category; it only feeds the [`VisibilityPolicy`] applied to scalar columns
//! afterwards.
//!
//! # Example
//!
//! ```rust
//! use tsprofile::classifier::{classify, Classification};
//! use tsprofile::table::{Column, Value};
//!
//! let column = Column::texts("status", vec!["OK"; 1000]);
//! let classification = classify(column.values(), column.kind(), 6);
//!
//! assert_eq!(
//!     classification,
//!     Classification::Constant { value: Value::Text("OK".into()) }
//! );
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::{Column, DataKind, Value};
use crate::visibility::{Visibility, VisibilityInput, VisibilityPolicy};

/// Default number of distinct values up to which a column is a state variable.
pub const DEFAULT_STATE_THRESHOLD: usize = 6;

/// The four behavioral categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Constant,
    Boolean,
    State,
    Scalar,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Constant,
        Category::Boolean,
        Category::State,
        Category::Scalar,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Constant => "constant",
            Category::Boolean => "boolean",
            Category::State => "state",
            Category::Scalar => "scalar",
        };
        write!(f, "{name}")
    }
}

/// Occurrence count of one distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Value,
    pub count: u64,
}

/// Change between two consecutive non-null samples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Both samples hold the same value.
    Unchanged,
    /// Signed difference `next - previous` of a numeric signal.
    Delta(Value),
    /// Change of a non-numeric signal.
    Relabel { from: String, to: String },
}

impl Transition {
    /// Classifies the step from `previous` to `next`.
    pub fn between(previous: &Value, next: &Value) -> Self {
        if previous == next {
            return Transition::Unchanged;
        }
        match (previous, next) {
            (Value::Integer(a), Value::Integer(b)) => match b.checked_sub(*a) {
                Some(delta) => Transition::Delta(Value::Integer(delta)),
                None => Transition::Delta(Value::float(*b as f64 - *a as f64)),
            },
            (Value::Boolean(a), Value::Boolean(b)) => {
                Transition::Delta(Value::Integer(*b as i64 - *a as i64))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Transition::Delta(Value::float(y - x)),
                _ => Transition::Relabel {
                    from: a.to_string(),
                    to: b.to_string(),
                },
            },
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Unchanged => write!(f, "0"),
            Transition::Delta(delta) => write!(f, "{delta}"),
            Transition::Relabel { from, to } => write!(f, "{from} -> {to}"),
        }
    }
}

/// Occurrence count of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCount {
    pub transition: Transition,
    pub count: u64,
}

/// Category plus the statistics that belong to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classification {
    Constant {
        value: Value,
    },
    Boolean {
        true_count: u64,
        false_count: u64,
        change_count: u64,
    },
    State {
        distinct_count: u64,
        unchanged_count: u64,
        changed_count: u64,
        value_counts: Vec<ValueCount>,
        transition_counts: Vec<TransitionCount>,
    },
    Scalar {
        distinct_count: u64,
        changed_percent: u32,
        min: Value,
        max: Value,
        visibility: Visibility,
    },
}

impl Classification {
    pub fn category(&self) -> Category {
        match self {
            Classification::Constant { .. } => Category::Constant,
            Classification::Boolean { .. } => Category::Boolean,
            Classification::State { .. } => Category::State,
            Classification::Scalar { .. } => Category::Scalar,
        }
    }

    /// Scalar visibility; `None` for the other categories.
    pub fn visibility(&self) -> Option<&Visibility> {
        match self {
            Classification::Scalar { visibility, .. } => Some(visibility),
            _ => None,
        }
    }
}

/// Per-column result handed to reporting and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub file: String,
    pub column: String,
    pub dtype: DataKind,
    pub row_count: u64,
    /// Mean timestamp delta of the owning file, in milliseconds
    pub update_interval: f64,
    pub classification: Classification,
}

impl ColumnRecord {
    pub fn category(&self) -> Category {
        self.classification.category()
    }

    /// Trace name used by renderers: `column(file)`.
    pub fn trace_name(&self) -> String {
        format!("{}({})", self.column, self.file)
    }
}

/// Classifies a column's values.
///
/// Pure function of its inputs. Scalar results are always `Shown`; apply a
/// [`VisibilityPolicy`] (or use [`ColumnClassifier`]) to decide visibility.
pub fn classify(values: &[Value], kind: DataKind, state_threshold: usize) -> Classification {
    let mut counts: HashMap<&Value, u64> = HashMap::new();
    for value in values.iter().filter(|v| !v.is_null()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    let distinct = counts.len();

    if distinct <= 1 {
        let value = counts.into_keys().next().cloned().unwrap_or(Value::Null);
        return Classification::Constant { value };
    }

    if kind == DataKind::Boolean && distinct == 2 {
        return boolean_stats(values, &counts);
    }

    if distinct <= state_threshold {
        return state_stats(values, counts);
    }

    scalar_stats(values, &counts)
}

/// Consecutive pairs with both samples present.
fn present_pairs(values: &[Value]) -> impl Iterator<Item = (&Value, &Value)> {
    values
        .windows(2)
        .filter(|w| !w[0].is_null() && !w[1].is_null())
        .map(|w| (&w[0], &w[1]))
}

fn boolean_stats(values: &[Value], counts: &HashMap<&Value, u64>) -> Classification {
    let true_count = counts.get(&Value::Boolean(true)).copied().unwrap_or(0);
    let false_count = counts.get(&Value::Boolean(false)).copied().unwrap_or(0);
    let change_count = present_pairs(values)
        .filter(|(a, b)| matches!(Transition::between(a, b), Transition::Delta(Value::Integer(1 | -1))))
        .count() as u64;

    Classification::Boolean {
        true_count,
        false_count,
        change_count,
    }
}

fn state_stats(values: &[Value], counts: HashMap<&Value, u64>) -> Classification {
    let distinct_count = counts.len() as u64;

    let mut value_counts: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.clone(),
            count,
        })
        .collect();
    value_counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

    let mut transitions: HashMap<Transition, u64> = HashMap::new();
    for (previous, next) in present_pairs(values) {
        *transitions
            .entry(Transition::between(previous, next))
            .or_insert(0) += 1;
    }

    let unchanged_pairs = transitions.get(&Transition::Unchanged).copied().unwrap_or(0);
    let changed_count: u64 = transitions
        .iter()
        .filter(|(t, _)| **t != Transition::Unchanged)
        .map(|(_, c)| *c)
        .sum();
    let unchanged_count = if changed_count == 0 {
        values.len() as u64
    } else {
        unchanged_pairs
    };

    let mut transition_counts: Vec<TransitionCount> = transitions
        .into_iter()
        .map(|(transition, count)| TransitionCount { transition, count })
        .collect();
    transition_counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.transition.cmp(&b.transition))
    });

    Classification::State {
        distinct_count,
        unchanged_count,
        changed_count,
        value_counts,
        transition_counts,
    }
}

fn scalar_stats(values: &[Value], counts: &HashMap<&Value, u64>) -> Classification {
    let changed = present_pairs(values).filter(|(a, b)| a != b).count();
    let changed_percent = percent_of(changed, values.len());

    let min = counts.keys().min().map(|v| (*v).clone()).unwrap_or(Value::Null);
    let max = counts.keys().max().map(|v| (*v).clone()).unwrap_or(Value::Null);

    Classification::Scalar {
        distinct_count: counts.len() as u64,
        changed_percent,
        min,
        max,
        visibility: Visibility::Shown,
    }
}

fn percent_of(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

/// Classifier bound to a state threshold and a visibility policy.
#[derive(Debug)]
pub struct ColumnClassifier {
    state_threshold: usize,
    policy: VisibilityPolicy,
}

impl ColumnClassifier {
    pub fn new(state_threshold: usize, policy: VisibilityPolicy) -> Self {
        Self {
            state_threshold,
            policy,
        }
    }

    pub fn state_threshold(&self) -> usize {
        self.state_threshold
    }

    /// Classifies one column of `file` and decides scalar visibility.
    pub fn classify_column(&self, file: &str, column: &Column, update_interval: f64) -> ColumnRecord {
        if column.len() <= 1 {
            debug!(
                file,
                column = column.name(),
                rows = column.len(),
                "Degenerate column, update interval taken as 0"
            );
        }

        let mut classification = classify(column.values(), column.kind(), self.state_threshold);
        if let Classification::Scalar {
            changed_percent,
            visibility,
            ..
        } = &mut classification
        {
            *visibility = self.policy.decide(&VisibilityInput {
                file,
                column: column.name(),
                changed_percent: *changed_percent,
            });
        }

        debug!(
            file,
            column = column.name(),
            category = %classification.category(),
            "Classified column"
        );

        ColumnRecord {
            file: file.to_string(),
            column: column.name().to_string(),
            dtype: column.kind(),
            row_count: column.len() as u64,
            update_interval,
            classification,
        }
    }
}

impl Default for ColumnClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_THRESHOLD, VisibilityPolicy::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::HiddenReason;

    #[test]
    fn test_constant_text_column() {
        let column = Column::texts("status", vec!["OK"; 1000]);
        assert_eq!(
            classify(column.values(), column.kind(), 6),
            Classification::Constant {
                value: Value::Text("OK".into())
            }
        );
    }

    #[test]
    fn test_all_null_column_is_constant() {
        let values = vec![Value::Null, Value::Null];
        assert_eq!(
            classify(&values, DataKind::Float, 6),
            Classification::Constant { value: Value::Null }
        );
    }

    #[test]
    fn test_boolean_counts_and_changes() {
        let column = Column::booleans("armed", [true, true, false, false, true]);
        assert_eq!(
            classify(column.values(), column.kind(), 6),
            Classification::Boolean {
                true_count: 3,
                false_count: 2,
                change_count: 2,
            }
        );
    }

    #[test]
    fn test_boolean_single_value_is_constant() {
        let column = Column::booleans("armed", [false, false, false]);
        assert_eq!(column.kind(), DataKind::Boolean);
        assert_eq!(
            classify(column.values(), column.kind(), 6).category(),
            Category::Constant
        );
    }

    #[test]
    fn test_state_counts() {
        let column = Column::integers("gear", [1, 1, 2, 3, 3, 3, 4, 1]);
        let Classification::State {
            distinct_count,
            unchanged_count,
            changed_count,
            value_counts,
            transition_counts,
        } = classify(column.values(), column.kind(), 6)
        else {
            panic!("expected a state classification");
        };

        assert_eq!(distinct_count, 4);
        assert_eq!(unchanged_count, 3);
        assert_eq!(changed_count, 4);
        assert_eq!(
            value_counts[0],
            ValueCount {
                value: Value::Integer(1),
                count: 3
            }
        );
        assert_eq!(
            value_counts[1],
            ValueCount {
                value: Value::Integer(3),
                count: 3
            }
        );
        let total: u64 = transition_counts.iter().map(|t| t.count).sum();
        assert_eq!(total, column.len() as u64 - 1);
        assert!(transition_counts.contains(&TransitionCount {
            transition: Transition::Delta(Value::Integer(-3)),
            count: 1
        }));
    }

    #[test]
    fn test_state_without_observed_changes() {
        // nulls break every pair, so no transition is observed
        let values = vec![Value::Integer(1), Value::Null, Value::Integer(2)];
        let Classification::State {
            unchanged_count,
            changed_count,
            transition_counts,
            ..
        } = classify(&values, DataKind::Integer, 6)
        else {
            panic!("expected a state classification");
        };

        assert_eq!(unchanged_count, 3);
        assert_eq!(changed_count, 0);
        assert!(transition_counts.is_empty());
    }

    #[test]
    fn test_state_text_transitions() {
        let column = Column::texts("mode", ["idle", "idle", "run", "idle"]);
        let Classification::State {
            transition_counts, ..
        } = classify(column.values(), column.kind(), 6)
        else {
            panic!("expected a state classification");
        };

        assert!(transition_counts.contains(&TransitionCount {
            transition: Transition::Relabel {
                from: "idle".into(),
                to: "run".into()
            },
            count: 1
        }));
        assert!(transition_counts.contains(&TransitionCount {
            transition: Transition::Unchanged,
            count: 1
        }));
    }

    #[test]
    fn test_state_scalar_boundary() {
        let values: Vec<Value> = (0..7).map(Value::Integer).collect();

        assert_eq!(classify(&values[..6], DataKind::Integer, 6).category(), Category::State);
        assert_eq!(classify(&values, DataKind::Integer, 6).category(), Category::Scalar);
        assert_eq!(classify(&values, DataKind::Integer, 7).category(), Category::State);
    }

    #[test]
    fn test_scalar_stats() {
        let column = Column::floats("speed", [1.0, 1.0, 2.5, 3.0, -4.0, 5.0, 6.0, 7.0, 7.0, 7.0]);
        let Classification::Scalar {
            distinct_count,
            changed_percent,
            min,
            max,
            visibility,
        } = classify(column.values(), column.kind(), 6)
        else {
            panic!("expected a scalar classification");
        };

        assert_eq!(distinct_count, 7);
        assert_eq!(changed_percent, 60);
        assert_eq!(min, Value::Float(-4.0));
        assert_eq!(max, Value::Float(7.0));
        assert_eq!(visibility, Visibility::Shown);
    }

    #[test]
    fn test_classifier_applies_visibility() {
        let classifier = ColumnClassifier::new(
            2,
            VisibilityPolicy::standard(Vec::<String>::new(), ["rx_delay"], 3),
        );
        let column = Column::integers("rx_delay", [1, 2, 3, 4]);

        let record = classifier.classify_column("can", &column, 10.0);

        assert_eq!(record.trace_name(), "rx_delay(can)");
        assert_eq!(record.row_count, 4);
        assert_eq!(record.dtype, DataKind::Integer);
        assert_eq!(
            record.classification.visibility(),
            Some(&Visibility::Hidden(HiddenReason::OnNameDenylist))
        );
    }

    #[test]
    fn test_single_row_column() {
        let classifier = ColumnClassifier::default();
        let record = classifier.classify_column("can", &Column::integers("rpm", [900]), 0.0);
        assert_eq!(record.category(), Category::Constant);
        assert_eq!(record.update_interval, 0.0);
    }

    #[test]
    fn test_classification_serializes_with_type_tag() {
        let json = serde_json::to_value(Classification::Boolean {
            true_count: 1,
            false_count: 2,
            change_count: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "boolean");
        assert_eq!(json["false_count"], 2);
    }
}
