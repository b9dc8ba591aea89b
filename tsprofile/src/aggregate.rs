//! File- and corpus-level accounting of classification results.
//!
//! The headline number is *constwaste*: the share of a file's bytes attributed
//! to columns that never change, `round(constant_columns / columns * size)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::{Category, ColumnRecord};
use crate::error::{ProfileError, Result};
use crate::table::SignalTable;

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Descriptive facts about a source file that do not depend on classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file: String,
    pub size_bytes: u64,
    pub row_count: u64,
    /// Stored fields, timestamp column included
    pub field_count: u64,
    /// Mean timestamp delta in milliseconds
    pub update_interval: f64,
}

impl FileMetadata {
    pub fn from_table(table: &SignalTable) -> Self {
        Self {
            file: table.file().to_string(),
            size_bytes: table.size_bytes(),
            row_count: table.row_count() as u64,
            field_count: table.field_count() as u64,
            update_interval: table.update_interval_ms(),
        }
    }
}

/// One row of the file table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file: String,
    pub row_count: u64,
    pub file_size: u64,
    pub field_count: u64,
    /// Average bytes per stored field, rounded
    pub field_size: u64,
    /// Mean timestamp delta in milliseconds, rounded
    pub update_interval: i64,
    pub column_count: u64,
    pub constant_count: u64,
    pub constwaste: u64,
}

/// Totals over every successfully profiled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub files: Vec<FileSummary>,
    pub total_file_size: u64,
    pub total_constwaste: u64,
    pub constwaste_percent: u64,
    pub total_file_size_mb: u64,
    pub total_constwaste_mb: u64,
}

/// Summarizes one file from the records of its signal columns.
///
/// Fails with a structural error when the file has no signal column.
pub fn summarize_file(meta: &FileMetadata, records: &[ColumnRecord]) -> Result<FileSummary> {
    let column_count = records.len() as u64;
    if column_count == 0 {
        return Err(ProfileError::structural(
            &meta.file,
            "file has no signal columns besides the timestamp",
        ));
    }

    let constant_count = records
        .iter()
        .filter(|r| r.category() == Category::Constant)
        .count() as u64;
    let constwaste =
        (constant_count as f64 / column_count as f64 * meta.size_bytes as f64).round() as u64;
    let field_size = if meta.field_count == 0 {
        0
    } else {
        (meta.size_bytes as f64 / meta.field_count as f64).round() as u64
    };

    Ok(FileSummary {
        file: meta.file.clone(),
        row_count: meta.row_count,
        file_size: meta.size_bytes,
        field_count: meta.field_count,
        field_size,
        update_interval: meta.update_interval.round() as i64,
        column_count,
        constant_count,
        constwaste,
    })
}

impl CorpusSummary {
    /// Sums per-file results; the waste percentage is 0 for an empty corpus.
    pub fn from_files(files: Vec<FileSummary>) -> Self {
        let total_file_size: u64 = files.iter().map(|f| f.file_size).sum();
        let total_constwaste: u64 = files.iter().map(|f| f.constwaste).sum();
        let constwaste_percent = if total_file_size == 0 {
            0
        } else {
            (100.0 * total_constwaste as f64 / total_file_size as f64).round() as u64
        };

        Self {
            files,
            total_file_size,
            total_constwaste,
            constwaste_percent,
            total_file_size_mb: (total_file_size as f64 / BYTES_PER_MB).round() as u64,
            total_constwaste_mb: (total_constwaste as f64 / BYTES_PER_MB).round() as u64,
        }
    }
}

/// Combines column records and file metadata into corpus totals.
///
/// Records are matched to files by file identifier. A file without signal
/// columns is left out of the totals and its structural error is returned
/// alongside, so one degenerate file never hides the rest of the corpus.
pub fn aggregate(
    records: &[ColumnRecord],
    files: &[FileMetadata],
) -> (CorpusSummary, Vec<ProfileError>) {
    let mut by_file: BTreeMap<&str, Vec<ColumnRecord>> = BTreeMap::new();
    for record in records {
        by_file
            .entry(record.file.as_str())
            .or_default()
            .push(record.clone());
    }

    let mut summaries = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for meta in files {
        let file_records = by_file
            .get(meta.file.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        match summarize_file(meta, file_records) {
            Ok(summary) => summaries.push(summary),
            Err(e) => failures.push(e),
        }
    }

    (CorpusSummary::from_files(summaries), failures)
}
