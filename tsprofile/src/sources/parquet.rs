//! Parquet loader backed by DataFusion.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use datafusion::prelude::{ParquetReadOptions, SessionContext};
use tracing::{debug, instrument};

use super::{expand_globs, TableLoader};
use crate::error::{ErrorContext, ProfileError, Result};
use crate::table::SignalTable;

pub const PARQUET_EXTENSION: &str = "parquet";

/// A set of Parquet files, one signal table each.
///
/// Files are identified by their file stem, so `logs/can.parquet` loads as
/// file `can`.
///
/// # Examples
///
/// ```rust,no_run
/// use tsprofile::sources::ParquetSource;
///
/// # fn example() -> tsprofile::error::Result<()> {
/// // every *.parquet file in a directory
/// let source = ParquetSource::from_dir("recordings")?;
///
/// // explicit files
/// let source = ParquetSource::from_paths(vec!["a.parquet".into(), "b.parquet".into()])?;
///
/// // glob pattern
/// let source = ParquetSource::from_glob("recordings/2024-*/*.parquet")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ParquetSource {
    /// File id to path
    files: BTreeMap<String, String>,
}

impl ParquetSource {
    /// Creates a source for a single file.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Self::from_paths(vec![path.into()])
    }

    /// Creates a source for several files. File stems must be unique.
    pub fn from_paths(paths: Vec<String>) -> Result<Self> {
        let mut files = BTreeMap::new();
        for path in paths {
            let file_id = file_id(&path)?;
            if let Some(previous) = files.insert(file_id.clone(), path.clone()) {
                return Err(ProfileError::Configuration(format!(
                    "'{previous}' and '{path}' share the file id '{file_id}'"
                )));
            }
        }
        Ok(Self { files })
    }

    /// Creates a source for every `.parquet` file directly inside `dir`.
    ///
    /// An empty directory yields an empty source.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ProfileError::Configuration(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }
        let pattern = format!("{}/*.{PARQUET_EXTENSION}", dir.display());
        Self::from_paths(expand_globs(&[pattern])?)
    }

    /// Creates a source for every file matching a glob pattern.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        Self::from_paths(expand_globs(&[pattern.into()])?)
    }

    pub fn path(&self, file_id: &str) -> Option<&str> {
        self.files.get(file_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn file_id(path: &str) -> Result<String> {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| ProfileError::Configuration(format!("'{path}' has no usable file name")))
}

#[async_trait]
impl TableLoader for ParquetSource {
    fn file_ids(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    #[instrument(skip(self), fields(source_type = "parquet"))]
    async fn load(&self, file_id: &str, timestamp_column: &str) -> Result<SignalTable> {
        let path = self.path(file_id).ok_or_else(|| {
            ProfileError::data_source("parquet", format!("unknown file id '{file_id}'"))
        })?;

        let size_bytes = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("reading metadata of '{path}'"))?
            .len();

        let ctx = SessionContext::new();
        let df = ctx
            .read_parquet(path, ParquetReadOptions::default())
            .await
            .with_context(|| format!("opening '{path}'"))?;
        let schema = df.schema().inner().clone();
        let batches = df.collect().await?;

        debug!(
            file = file_id,
            path,
            size_bytes,
            batches = batches.len(),
            "Read parquet file"
        );

        SignalTable::from_batches(file_id, size_bytes, schema, &batches, timestamp_column)
    }

    fn description(&self) -> String {
        format!("parquet ({} files)", self.files.len())
    }
}
