//! # tsprofile - behavioral profiling of time-series signals
//!
//! tsprofile looks at recorded telemetry (one table per file, one timestamp
//! axis, many signal columns) and answers two questions:
//!
//! 1. **What kind of signal is each column?** Every column is classified as
//!    *constant*, *boolean*, *state* (few distinct values) or *scalar*, with
//!    the statistics that matter for its category.
//! 2. **What does it take to plot it?** Scalar traces are reduced to the
//!    points that redraw their step shape, boolean traces become annotated
//!    transition events on parallel lanes.
//!
//! Across a corpus of files it also accounts *constwaste*: the bytes spent
//! storing columns that never change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsprofile::prelude::*;
//! use tsprofile::formatters::{MarkdownFormatter, ReportFormatter};
//!
//! # async fn example() -> tsprofile::error::Result<()> {
//! let source = ParquetSource::from_dir("recordings")?;
//! let profiler = SignalProfiler::builder()
//!     .state_threshold(6)
//!     .min_change_percent(3)
//!     .hidden_columns(["rx_delay"])
//!     .build()?;
//!
//! let report = profiler.profile_source(&source).await;
//! println!("{}", MarkdownFormatter::new().format(&report)?);
//! for failure in &report.failures {
//!     eprintln!("skipped {}: {}", failure.file, failure.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`table`**: the in-memory signal table and its Arrow conversion
//! - **`classifier`**: per-column category and statistics
//! - **`visibility`**: ordered rules deciding which scalar traces are plotted
//! - **`reduce`**: display reduction of scalar and boolean traces
//! - **`aggregate`**: per-file and corpus constwaste accounting
//! - **`render`**: plottable traces and per-category summary tables
//! - **`profiler`**: the end-to-end pipeline with per-file failure isolation
//! - **`sources`**: Parquet loading through DataFusion
//! - **`formatters`**: JSON, plain text and Markdown reports
//!
//! Classification and reduction are pure functions over borrowed slices; the
//! profiler only adds configuration, logging and concurrency around them.

pub mod aggregate;
pub mod classifier;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod profiler;
pub mod reduce;
pub mod render;
pub mod sources;
pub mod table;
pub mod visibility;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
