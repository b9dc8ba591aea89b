//! Telemetry fixtures shared by unit tests, integration tests and benches.
//!
//! The telemetry recording has 100 rows sampled every 10 ms and one column
//! per category, plus the `timediff` helper column:
//!
//! | column     | type    | category |
//! |------------|---------|----------|
//! | `armed`    | bool    | Boolean  |
//! | `gear`     | int64   | State (4 distinct values) |
//! | `rpm`      | float64 | Scalar   |
//! | `status`   | utf8    | Constant (`"OK"`) |
//! | `timediff` | int64   | ignored  |

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::error::{ProfileError, Result};
use crate::table::SignalTable;

pub const TELEMETRY_ROWS: usize = 100;
pub const TELEMETRY_INTERVAL_MS: i64 = 10;

/// Telemetry recording as a single Arrow batch.
pub fn telemetry_batch() -> Result<RecordBatch> {
    let n = TELEMETRY_ROWS as i64;
    let schema = Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Int64, false),
        Field::new("armed", DataType::Boolean, false),
        Field::new("gear", DataType::Int64, false),
        Field::new("rpm", DataType::Float64, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("timediff", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            (0..n).map(|i| i * TELEMETRY_INTERVAL_MS),
        )),
        Arc::new(BooleanArray::from_iter((0..n).map(|i| Some(i % 40 < 20)))),
        Arc::new(Int64Array::from_iter_values((0..n).map(|i| i / 25 + 1))),
        Arc::new(Float64Array::from_iter_values(
            (0..n).map(|i| 800.0 + (i * 37 % 500) as f64),
        )),
        Arc::new(StringArray::from_iter_values((0..n).map(|_| "OK"))),
        Arc::new(Int64Array::from_iter_values(
            (0..n).map(|_| TELEMETRY_INTERVAL_MS),
        )),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Telemetry recording as a table named `file`.
pub fn telemetry_table(file: &str, size_bytes: u64) -> Result<SignalTable> {
    let batch = telemetry_batch()?;
    SignalTable::from_batches(file, size_bytes, batch.schema(), &[batch], "timestamp")
}

/// Writes batches to a Parquet file.
pub fn write_parquet(path: &Path, batches: &[RecordBatch]) -> Result<()> {
    let Some(first) = batches.first() else {
        return Err(ProfileError::invalid_input("no batches to write"));
    };
    let parquet_error = |e: parquet::errors::ParquetError| {
        ProfileError::data_source_with_source("parquet", "failed to write fixture", Box::new(e))
    };

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, first.schema(), None).map_err(parquet_error)?;
    for batch in batches {
        writer.write(batch).map_err(parquet_error)?;
    }
    writer.close().map_err(parquet_error)?;
    Ok(())
}
