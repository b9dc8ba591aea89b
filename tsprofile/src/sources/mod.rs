//! Loaders that turn stored files into [`SignalTable`]s.
//!
//! Every file is one table: a timestamp column plus any number of signal
//! columns. Loaders enumerate the files they know about and load them one at
//! a time so the profiler can fan the work out and keep going when a single
//! file is malformed.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::{ProfileError, Result};
use crate::table::SignalTable;

mod parquet;

pub use parquet::{ParquetSource, PARQUET_EXTENSION};

/// A collection of files that can be loaded as signal tables.
///
/// # Examples
///
/// ```rust,no_run
/// use tsprofile::sources::{ParquetSource, TableLoader};
///
/// # async fn example() -> tsprofile::error::Result<()> {
/// let source = ParquetSource::from_dir("recordings")?;
/// for file_id in source.file_ids() {
///     let table = source.load(&file_id, "timestamp").await?;
///     println!("{file_id}: {} rows", table.row_count());
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TableLoader: Debug + Send + Sync {
    /// Identifiers of every file this loader can load, in load order.
    fn file_ids(&self) -> Vec<String>;

    /// Loads one file, using `timestamp_column` as its time axis.
    ///
    /// A file that cannot be turned into a table, e.g. because the timestamp
    /// column is missing, fails with a structural error.
    async fn load(&self, file_id: &str, timestamp_column: &str) -> Result<SignalTable>;

    /// Human-readable description for logs.
    fn description(&self) -> String;
}

/// Expands glob patterns into a sorted, deduplicated list of file paths.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob::glob(pattern).map_err(|e| {
            ProfileError::Configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry.map_err(|e| ProfileError::Io(std::io::Error::other(e)))?;
            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    paths.sort();
    paths.dedup();
    Ok(paths)
}
