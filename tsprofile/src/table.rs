//! In-memory tables of logged signals.
//!
//! A [`SignalTable`] is one source file materialized in memory: a shared
//! millisecond timestamp axis plus any number of named [`Column`]s of equal
//! length. Tables are immutable once built; everything the profiler derives
//! from them is recomputed on demand.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProfileError, Result};

/// Name of the timestamp column unless configured otherwise.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// A single sample value.
///
/// Floats are normalized on construction: `NaN` becomes [`Value::Null`] and
/// `-0.0` becomes `0.0`, so equality, ordering and hashing agree with the
/// notion of "distinct value" used by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Builds a float value, mapping `NaN` to null.
    pub fn float(v: f64) -> Self {
        if v.is_nan() {
            Value::Null
        } else if v == 0.0 {
            Value::Float(0.0)
        } else {
            Value::Float(v)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; booleans are coded as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Null | Value::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::Text(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Storage type of a column, as far as classification cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Boolean,
    Integer,
    Float,
    /// Anything else that can be compared for equality (strings, dates, ...)
    Other,
}

impl DataKind {
    /// Whether a column of this kind may hold `value`. Nulls fit every kind.
    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (DataKind::Boolean, Value::Boolean(_))
                | (DataKind::Integer, Value::Integer(_))
                | (DataKind::Float, Value::Float(_))
                | (DataKind::Other, Value::Text(_))
        )
    }

    fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Boolean => DataKind::Boolean,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => DataKind::Integer,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => DataKind::Float,
            _ => DataKind::Other,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Boolean => "bool",
            DataKind::Integer => "int64",
            DataKind::Float => "float64",
            DataKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// One named signal of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: DataKind,
    values: Vec<Value>,
}

impl Column {
    /// Builds a column, rejecting values that do not fit `kind`.
    ///
    /// Floats are normalized the same way as [`Value::float`].
    pub fn new(name: impl Into<String>, kind: DataKind, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if let Some((row, value)) = values.iter().enumerate().find(|(_, v)| !kind.admits(v)) {
            return Err(ProfileError::invalid_input(format!(
                "column '{name}' is declared {kind} but row {row} holds {value:?}"
            )));
        }
        let values = values
            .into_iter()
            .map(|v| match v {
                Value::Float(f) => Value::float(f),
                other => other,
            })
            .collect();
        Ok(Self::typed(name, kind, values))
    }

    fn typed(name: impl Into<String>, kind: DataKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn booleans(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::typed(
            name,
            DataKind::Boolean,
            values.into_iter().map(Value::Boolean).collect(),
        )
    }

    pub fn integers(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::typed(
            name,
            DataKind::Integer,
            values.into_iter().map(Value::Integer).collect(),
        )
    }

    pub fn floats(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::typed(
            name,
            DataKind::Float,
            values.into_iter().map(Value::float).collect(),
        )
    }

    pub fn texts<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::typed(
            name,
            DataKind::Other,
            values.into_iter().map(|s| Value::Text(s.into())).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One source file materialized in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalTable {
    file: String,
    size_bytes: u64,
    timestamps: Vec<i64>,
    columns: Vec<Column>,
}

impl SignalTable {
    /// Builds a table, checking that every column matches the timestamp axis.
    pub fn new(
        file: impl Into<String>,
        size_bytes: u64,
        timestamps: Vec<i64>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let file = file.into();
        for column in &columns {
            if column.len() != timestamps.len() {
                return Err(ProfileError::structural(
                    &file,
                    format!(
                        "column '{}' has {} rows but the timestamp axis has {}",
                        column.name(),
                        column.len(),
                        timestamps.len()
                    ),
                ));
            }
        }
        if timestamps.windows(2).any(|w| w[1] < w[0]) {
            warn!(file = %file, "timestamp axis is not sorted ascending");
        }
        Ok(Self {
            file,
            size_bytes,
            timestamps,
            columns,
        })
    }

    /// Converts Arrow record batches into a table.
    ///
    /// The column named `timestamp_column` becomes the time axis (integer
    /// columns are taken as milliseconds, Arrow timestamps are converted to
    /// milliseconds). Booleans, integers and floats keep their kind; every
    /// other type is rendered to text.
    pub fn from_batches(
        file: impl Into<String>,
        size_bytes: u64,
        schema: SchemaRef,
        batches: &[RecordBatch],
        timestamp_column: &str,
    ) -> Result<Self> {
        let file = file.into();
        let batch = concat_batches(&schema, batches)?;

        let ts_index = schema.index_of(timestamp_column).map_err(|_| {
            ProfileError::structural(&file, format!("missing '{timestamp_column}' column"))
        })?;
        let timestamps = timestamp_axis(&file, batch.column(ts_index))?;

        let mut columns = Vec::with_capacity(schema.fields().len().saturating_sub(1));
        for (index, field) in schema.fields().iter().enumerate() {
            if index == ts_index {
                continue;
            }
            let array = batch.column(index);
            let kind = DataKind::from_arrow(field.data_type());
            let values = column_values(kind, array)?;
            columns.push(Column::typed(field.name().clone(), kind, values));
        }

        debug!(
            file = %file,
            rows = timestamps.len(),
            columns = columns.len(),
            "Converted record batches into signal table"
        );

        Self::new(file, size_bytes, timestamps, columns)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of stored fields, timestamp column included.
    pub fn field_count(&self) -> usize {
        self.row_count() * (self.columns.len() + 1)
    }

    /// Mean delta between consecutive timestamps in milliseconds.
    ///
    /// Zero when there are fewer than two rows.
    pub fn update_interval_ms(&self) -> f64 {
        mean_delta(&self.timestamps)
    }
}

pub(crate) fn mean_delta(timestamps: &[i64]) -> f64 {
    if timestamps.len() < 2 {
        return 0.0;
    }
    let first = timestamps[0] as f64;
    let last = timestamps[timestamps.len() - 1] as f64;
    (last - first) / (timestamps.len() - 1) as f64
}

fn timestamp_axis(file: &str, array: &ArrayRef) -> Result<Vec<i64>> {
    let as_int = match array.data_type() {
        DataType::Timestamp(TimeUnit::Millisecond, _) => cast(array, &DataType::Int64)?,
        DataType::Timestamp(_, _) => {
            let millis = cast(array, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            cast(&millis, &DataType::Int64)?
        }
        t if t.is_integer() => cast(array, &DataType::Int64)?,
        other => {
            return Err(ProfileError::structural(
                file,
                format!("timestamp column has unsupported type {other}"),
            ))
        }
    };
    if as_int.null_count() > 0 {
        return Err(ProfileError::structural(
            file,
            "timestamp column contains nulls",
        ));
    }
    Ok(as_int.as_primitive::<Int64Type>().values().to_vec())
}

fn column_values(kind: DataKind, array: &ArrayRef) -> Result<Vec<Value>> {
    let values = match kind {
        DataKind::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Boolean))
            .collect(),
        DataKind::Integer => cast(array, &DataType::Int64)?
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Integer))
            .collect(),
        DataKind::Float => cast(array, &DataType::Float64)?
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::float))
            .collect(),
        DataKind::Other => {
            let options = FormatOptions::default();
            let formatter = ArrayFormatter::try_new(array.as_ref(), &options)?;
            (0..array.len())
                .map(|i| {
                    if array.is_null(i) {
                        Value::Null
                    } else {
                        Value::Text(formatter.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float32Array, Int32Array, StringArray, TimestampMicrosecondArray};
    use arrow::datatypes::{Field, Schema};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_float_normalization() {
        assert!(Value::float(f64::NAN).is_null());
        assert_eq!(Value::float(-0.0), Value::float(0.0));

        let distinct: HashSet<Value> = [Value::float(-0.0), Value::float(0.0), Value::float(1.5)]
            .into_iter()
            .collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Integer(-3) < Value::Integer(2));
        assert!(Value::Float(1.5) < Value::Float(2.0));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
        assert!(Value::Null < Value::Boolean(false));
        assert_eq!(Value::Boolean(true).as_f64(), Some(1.0));
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Boolean(true),
            Value::Integer(3),
            Value::Float(2.5),
            Value::Text("OK".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,true,3,2.5,"OK"]"#);
    }

    #[test]
    fn test_table_rejects_length_mismatch() {
        let err = SignalTable::new(
            "can",
            100,
            vec![0, 10, 20],
            vec![Column::integers("speed", [1, 2])],
        )
        .unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("'speed' has 2 rows"));
    }

    #[test]
    fn test_update_interval() {
        let table = SignalTable::new("can", 0, vec![0, 10, 30], vec![]).unwrap();
        assert_eq!(table.update_interval_ms(), 15.0);

        let single = SignalTable::new("can", 0, vec![42], vec![]).unwrap();
        assert_eq!(single.update_interval_ms(), 0.0);
        assert_eq!(single.field_count(), 1);
    }

    #[test]
    fn test_from_batches_converts_types() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("armed", DataType::Boolean, true),
            Field::new("mode", DataType::Int32, true),
            Field::new("voltage", DataType::Float32, true),
            Field::new("status", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMicrosecondArray::from(vec![0, 10_000, 20_000])),
                Arc::new(BooleanArray::from(vec![Some(true), None, Some(false)])),
                Arc::new(Int32Array::from(vec![1, 2, 2])),
                Arc::new(Float32Array::from(vec![12.5, f32::NAN, 11.0])),
                Arc::new(StringArray::from(vec!["OK", "OK", "WARN"])),
            ],
        )
        .unwrap();

        let table = SignalTable::from_batches("power", 2048, schema, &[batch], "timestamp").unwrap();

        assert_eq!(table.timestamps(), &[0, 10, 20]);
        assert_eq!(table.columns().len(), 4);

        let armed = table.column("armed").unwrap();
        assert_eq!(armed.kind(), DataKind::Boolean);
        assert!(armed.values()[1].is_null());

        assert_eq!(table.column("mode").unwrap().kind(), DataKind::Integer);

        let voltage = table.column("voltage").unwrap();
        assert_eq!(voltage.kind(), DataKind::Float);
        assert!(voltage.values()[1].is_null());

        let status = table.column("status").unwrap();
        assert_eq!(status.kind(), DataKind::Other);
        assert_eq!(status.values()[2], Value::Text("WARN".into()));
    }

    #[test]
    fn test_from_batches_requires_timestamp() {
        let schema = Arc::new(Schema::new(vec![Field::new("mode", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1]))]).unwrap();

        let err = SignalTable::from_batches("imu", 0, schema, &[batch], "timestamp").unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("missing 'timestamp' column"));
    }

    #[test]
    fn test_column_rejects_values_of_another_kind() {
        let err = Column::new(
            "armed",
            DataKind::Boolean,
            vec![Value::Integer(0), Value::Integer(1), Value::Integer(1)],
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidInput(_)));
        assert!(err.to_string().contains("declared bool but row 0"));

        let column = Column::new(
            "voltage",
            DataKind::Float,
            vec![Value::Float(f64::NAN), Value::Null, Value::Float(-0.0)],
        )
        .unwrap();
        assert!(column.values()[0].is_null());
        assert_eq!(column.values()[2], Value::float(0.0));
        assert!(!DataKind::Integer.admits(&Value::Float(1.0)));
        assert!(DataKind::Other.admits(&Value::Null));
    }
}
