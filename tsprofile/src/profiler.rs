//! End-to-end profiling of signal tables.
//!
//! [`SignalProfiler`] classifies every column of every table, reduces the
//! traces worth plotting and aggregates the per-file accounting into a
//! [`ProfileReport`]. Files are independent: a malformed file becomes a
//! [`FileFailure`] in the report and the run carries on with the rest.
//!
//! # Example
//!
//! ```rust
//! use tsprofile::prelude::*;
//! use tsprofile::table::{Column, SignalTable};
//!
//! # #[tokio::main]
//! # async fn main() -> tsprofile::error::Result<()> {
//! let table = SignalTable::new(
//!     "can",
//!     4_000,
//!     vec![0, 10, 20, 30],
//!     vec![
//!         Column::integers("gear", [1, 1, 2, 2]),
//!         Column::texts("status", ["OK", "OK", "OK", "OK"]),
//!     ],
//! )?;
//!
//! let profiler = SignalProfiler::builder().state_threshold(6).build()?;
//! let report = profiler.profile_tables(vec![table]).await;
//!
//! assert!(report.failures.is_empty());
//! assert_eq!(report.corpus.total_constwaste, 2_000);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::aggregate::{summarize_file, CorpusSummary, FileMetadata, FileSummary};
use crate::classifier::{Classification, ColumnClassifier, ColumnRecord, DEFAULT_STATE_THRESHOLD};
use crate::error::{ProfileError, Result};
use crate::logging::{truncate_field, LogConfig};
use crate::reduce::{reduce_boolean, reduce_scalar};
use crate::render::{
    BooleanTrace, RenderGroups, ScalarTrace, SummaryTables, DEFAULT_MAX_VISIBLE_TRACES,
};
use crate::sources::TableLoader;
use crate::table::{Column, SignalTable, Value, DEFAULT_TIMESTAMP_COLUMN};
use crate::visibility::{VisibilityPolicy, DEFAULT_MIN_CHANGE_PERCENT};
use crate::{log_column, log_data_op, perf_debug};

/// Helper columns that never carry a signal.
pub const DEFAULT_IGNORED_COLUMNS: &[&str] = &["timediff"];

/// Configuration of a profiling run.
///
/// Every field has a default, so a JSON document only needs to name what it
/// changes:
///
/// ```rust
/// use tsprofile::profiler::ProfilerConfig;
///
/// let config = ProfilerConfig::from_json(r#"{ "state_threshold": 10 }"#).unwrap();
/// assert_eq!(config.state_threshold, 10);
/// assert_eq!(config.min_change_percent, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Maximum distinct values of a State column (K)
    pub state_threshold: usize,
    /// Scalars changing in fewer percent of samples are hidden
    pub min_change_percent: u32,
    /// Scalar column names never plotted
    pub hidden_columns: Vec<String>,
    /// Files whose scalars are never plotted
    pub hidden_files: Vec<String>,
    /// Columns skipped entirely, like the timestamp
    pub ignored_columns: Vec<String>,
    pub timestamp_column: String,
    /// Profile files concurrently on blocking worker threads
    pub enable_parallel: bool,
    /// Scalar traces visible before the rest become legend-only
    pub max_visible_traces: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            state_threshold: DEFAULT_STATE_THRESHOLD,
            min_change_percent: DEFAULT_MIN_CHANGE_PERCENT,
            hidden_columns: Vec::new(),
            hidden_files: Vec::new(),
            ignored_columns: DEFAULT_IGNORED_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            enable_parallel: true,
            max_visible_traces: DEFAULT_MAX_VISIBLE_TRACES,
        }
    }
}

impl ProfilerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // a Boolean needs two distinct values, so K below 2 leaves no room for State
        if self.state_threshold < 2 {
            return Err(ProfileError::Configuration(format!(
                "state_threshold must be at least 2, got {}",
                self.state_threshold
            )));
        }
        if self.min_change_percent > 100 {
            return Err(ProfileError::Configuration(format!(
                "min_change_percent must be within 0..=100, got {}",
                self.min_change_percent
            )));
        }
        if self.timestamp_column.is_empty() {
            return Err(ProfileError::Configuration(
                "timestamp_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn is_ignored(&self, column: &str) -> bool {
        self.ignored_columns.iter().any(|c| c == column)
    }
}

/// Builder for [`SignalProfiler`].
#[derive(Debug, Default)]
pub struct SignalProfilerBuilder {
    config: ProfilerConfig,
    log_config: LogConfig,
}

impl SignalProfilerBuilder {
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the State/Scalar threshold K.
    pub fn state_threshold(mut self, threshold: usize) -> Self {
        self.config.state_threshold = threshold;
        self
    }

    pub fn min_change_percent(mut self, percent: u32) -> Self {
        self.config.min_change_percent = percent;
        self
    }

    pub fn hidden_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.hidden_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn hidden_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.hidden_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn ignored_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.config.timestamp_column = column.into();
        self
    }

    pub fn enable_parallel(mut self, enable: bool) -> Self {
        self.config.enable_parallel = enable;
        self
    }

    pub fn max_visible_traces(mut self, count: usize) -> Self {
        self.config.max_visible_traces = count;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Validates the configuration and builds the profiler.
    pub fn build(self) -> Result<SignalProfiler> {
        self.config.validate()?;

        let policy = VisibilityPolicy::standard(
            self.config.hidden_files.iter().cloned(),
            self.config.hidden_columns.iter().cloned(),
            self.config.min_change_percent,
        );
        let classifier = ColumnClassifier::new(self.config.state_threshold, policy);

        Ok(SignalProfiler {
            inner: Arc::new(Inner {
                config: self.config,
                log_config: self.log_config,
                classifier,
            }),
        })
    }
}

#[derive(Debug)]
struct Inner {
    config: ProfilerConfig,
    log_config: LogConfig,
    classifier: ColumnClassifier,
}

/// Classifies, reduces and accounts signal tables.
///
/// Cloning is cheap; clones share the configuration.
#[derive(Debug, Clone)]
pub struct SignalProfiler {
    inner: Arc<Inner>,
}

/// Everything derived from a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProfile {
    pub summary: FileSummary,
    pub records: Vec<ColumnRecord>,
    /// Reduced traces of the visible scalar columns
    pub scalar_traces: Vec<ScalarTrace>,
    /// Encoded traces of the boolean columns, all on lane 0
    pub boolean_traces: Vec<BooleanTrace>,
}

/// A file that could not be profiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Result of a profiling run over many files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub generated_at: DateTime<Utc>,
    pub state_threshold: usize,
    pub min_change_percent: u32,
    pub corpus: CorpusSummary,
    pub records: Vec<ColumnRecord>,
    pub traces: RenderGroups,
    pub failures: Vec<FileFailure>,
}

impl ProfileReport {
    pub fn summary_tables(&self) -> SummaryTables {
        SummaryTables::from_records(&self.records)
    }

    /// True when every file was profiled.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl SignalProfiler {
    pub fn builder() -> SignalProfilerBuilder {
        SignalProfilerBuilder::default()
    }

    /// Creates a profiler from a configuration.
    pub fn with_config(config: ProfilerConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.inner.config
    }

    /// Profiles one table.
    ///
    /// Fails with a structural error when the table has no signal column
    /// once the timestamp and ignored columns are set aside.
    #[instrument(skip(self, table), fields(file = %table.file()))]
    pub fn profile_table(&self, table: &SignalTable) -> Result<FileProfile> {
        let config = &self.inner.config;
        let log_config = &self.inner.log_config;
        let file = table.file();
        let update_interval = table.update_interval_ms();

        let columns: Vec<&Column> = table
            .columns()
            .iter()
            .filter(|c| !config.is_ignored(c.name()))
            .collect();
        if columns.is_empty() {
            return Err(ProfileError::structural(
                file,
                "file has no signal columns besides the timestamp",
            ));
        }

        let mut records = Vec::with_capacity(columns.len());
        let mut scalar_traces = Vec::new();
        let mut boolean_traces = Vec::new();

        for column in columns {
            let record = self
                .inner
                .classifier
                .classify_column(file, column, update_interval);

            log_column!(
                log_config,
                file,
                column = %truncate_field(column.name(), log_config.max_field_length),
                category = %record.category(),
                "Column classified"
            );

            match &record.classification {
                Classification::Scalar { visibility, .. } if visibility.is_shown() => {
                    let (times, values) = present_samples(table.timestamps(), column);
                    let points = reduce_scalar(&times, &values)?;
                    log_reduction(log_config, &record, column.len(), points.len());
                    scalar_traces.push(ScalarTrace::from_samples(
                        record.trace_name(),
                        column.len(),
                        points,
                    ));
                }
                Classification::Boolean { .. } => {
                    let (times, values) = present_samples(table.timestamps(), column);
                    let flags: Vec<bool> = values.iter().filter_map(Value::as_bool).collect();
                    let events = reduce_boolean(column.name(), &times, &flags, 0.0)?;
                    log_reduction(log_config, &record, column.len(), events.len());
                    boolean_traces.push(BooleanTrace::new(
                        record.trace_name(),
                        column.len(),
                        0.0,
                        events,
                    ));
                }
                _ => {}
            }

            records.push(record);
        }

        let summary = summarize_file(&FileMetadata::from_table(table), &records)?;

        log_data_op!(
            log_config,
            file,
            columns = summary.column_count,
            constants = summary.constant_count,
            constwaste = summary.constwaste,
            "Profiled file"
        );

        Ok(FileProfile {
            summary,
            records,
            scalar_traces,
            boolean_traces,
        })
    }

    /// Profiles already loaded tables.
    ///
    /// With parallelism enabled, tables are profiled on blocking worker
    /// threads, at most one per CPU; results keep the input order either way.
    #[instrument(skip(self, tables), fields(files = tables.len()))]
    pub async fn profile_tables(&self, tables: Vec<SignalTable>) -> ProfileReport {
        let outcomes = if self.inner.config.enable_parallel && tables.len() > 1 {
            stream::iter(tables)
                .map(|table| {
                    let profiler = self.clone();
                    let file = table.file().to_string();
                    async move {
                        let result = tokio::task::spawn_blocking(move || profiler.profile_table(&table))
                            .await
                            .unwrap_or_else(|e| {
                                Err(ProfileError::Internal(format!("Task join error: {e}")))
                            });
                        (file, result)
                    }
                })
                .buffered(num_cpus::get())
                .collect::<Vec<_>>()
                .await
        } else {
            tables
                .iter()
                .map(|table| (table.file().to_string(), self.profile_table(table)))
                .collect()
        };

        self.build_report(outcomes, Vec::new())
    }

    /// Loads and profiles every file of a loader.
    ///
    /// Files that fail to load are reported alongside files that fail to
    /// profile.
    #[instrument(skip(self, loader), fields(source = %loader.description()))]
    pub async fn profile_source(&self, loader: &dyn TableLoader) -> ProfileReport {
        let timestamp_column = self.inner.config.timestamp_column.as_str();
        let loaded = stream::iter(loader.file_ids())
            .map(|file_id| async move {
                let result = loader.load(&file_id, timestamp_column).await;
                (file_id, result)
            })
            .buffered(num_cpus::get())
            .collect::<Vec<_>>()
            .await;

        let mut tables = Vec::with_capacity(loaded.len());
        let mut load_failures = Vec::new();
        for (file_id, result) in loaded {
            match result {
                Ok(table) => tables.push(table),
                Err(e) => load_failures.push(failure(file_id, &e)),
            }
        }

        log_data_op!(
            self.inner.log_config,
            loaded = tables.len(),
            failed = load_failures.len(),
            "Loaded tables"
        );

        let mut report = self.profile_tables(tables).await;
        load_failures.append(&mut report.failures);
        report.failures = load_failures;
        report
    }

    fn build_report(
        &self,
        outcomes: Vec<(String, Result<FileProfile>)>,
        mut failures: Vec<FileFailure>,
    ) -> ProfileReport {
        let config = &self.inner.config;
        let mut summaries = Vec::new();
        let mut records = Vec::new();
        let mut scalar = Vec::new();
        let mut boolean = Vec::new();

        for (file, outcome) in outcomes {
            match outcome {
                Ok(profile) => {
                    summaries.push(profile.summary);
                    records.extend(profile.records);
                    scalar.extend(profile.scalar_traces);
                    boolean.extend(profile.boolean_traces);
                }
                Err(e) => failures.push(failure(file, &e)),
            }
        }

        let corpus = CorpusSummary::from_files(summaries);
        info!(
            files = corpus.files.len(),
            failed = failures.len(),
            constwaste_percent = corpus.constwaste_percent,
            "Profiling complete"
        );

        ProfileReport {
            generated_at: Utc::now(),
            state_threshold: config.state_threshold,
            min_change_percent: config.min_change_percent,
            corpus,
            records,
            traces: RenderGroups::assemble(scalar, boolean, config.max_visible_traces),
            failures,
        }
    }
}

fn failure(file: String, error: &ProfileError) -> FileFailure {
    warn!(file = %file, error = %error, "File skipped");
    FileFailure {
        file,
        message: error.to_string(),
    }
}

/// Timestamps and values of the non-null samples of a column.
fn present_samples(timestamps: &[i64], column: &Column) -> (Vec<i64>, Vec<Value>) {
    timestamps
        .iter()
        .zip(column.values())
        .filter(|(_, v)| !v.is_null())
        .map(|(t, v)| (*t, v.clone()))
        .unzip()
}

fn log_reduction(log_config: &LogConfig, record: &ColumnRecord, original: usize, reduced: usize) {
    if log_config.log_reductions {
        perf_debug!(
            log_config,
            trace = %record.trace_name(),
            original,
            reduced,
            "Reduced trace"
        );
    }
}
