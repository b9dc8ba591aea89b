//! Prelude for commonly used types and traits in tsprofile.

pub use crate::classifier::{Category, Classification, ColumnRecord};
pub use crate::error::{ErrorContext, ProfileError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::profiler::{ProfileReport, ProfilerConfig, SignalProfiler};
pub use crate::sources::{ParquetSource, TableLoader};
