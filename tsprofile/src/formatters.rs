//! Output formats for profile reports.
//!
//! Three formatters render a [`ProfileReport`]: JSON for tooling, a plain
//! text summary for terminals and Markdown tables for documentation.
//!
//! # Examples
//!
//! ```rust
//! use tsprofile::formatters::{FormatterConfig, HumanFormatter, ReportFormatter};
//! # use tsprofile::prelude::*;
//! # use tsprofile::table::{Column, SignalTable};
//! # #[tokio::main]
//! # async fn main() -> tsprofile::error::Result<()> {
//! # let table = SignalTable::new("can", 100, vec![0, 1], vec![Column::integers("x", [1, 2])])?;
//! # let report = SignalProfiler::builder().build()?.profile_tables(vec![table]).await;
//!
//! let formatter = HumanFormatter::with_config(FormatterConfig::minimal());
//! let text = formatter.format(&report)?;
//! assert!(text.contains("Corpus"));
//! # Ok(())
//! # }
//! ```

use std::fmt::Write;

use crate::classifier::{Category, Classification, ColumnRecord};
use crate::error::Result;
use crate::profiler::ProfileReport;

/// What goes into a formatted report.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the per-file table
    pub include_file_table: bool,
    /// Include one table per category
    pub include_category_tables: bool,
    /// Include reduced traces (JSON only)
    pub include_traces: bool,
    /// Include files that failed to profile
    pub include_failures: bool,
    /// Maximum rows per table, `None` for all
    pub max_rows: Option<usize>,
    /// Whether to use colorized output (human formatter)
    pub use_colors: bool,
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_file_table: true,
            include_category_tables: true,
            include_traces: true,
            include_failures: true,
            max_rows: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Corpus totals and failures only.
    pub fn minimal() -> Self {
        Self {
            include_file_table: false,
            include_category_tables: false,
            include_traces: false,
            include_failures: true,
            max_rows: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    pub fn detailed() -> Self {
        Self::default()
    }

    /// Bounded, uncolored output for CI logs.
    pub fn ci() -> Self {
        Self {
            include_file_table: true,
            include_category_tables: true,
            include_traces: false,
            include_failures: true,
            max_rows: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_traces(mut self, include: bool) -> Self {
        self.include_traces = include;
        self
    }

    pub fn with_category_tables(mut self, include: bool) -> Self {
        self.include_category_tables = include;
        self
    }

    pub fn with_max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn row_limit(&self) -> usize {
        self.max_rows.unwrap_or(usize::MAX)
    }
}

/// Renders a [`ProfileReport`] into a string.
///
/// # Examples
///
/// ```rust
/// use tsprofile::formatters::{FormatterConfig, ReportFormatter};
/// use tsprofile::profiler::ProfileReport;
///
/// struct OneLine;
///
/// impl ReportFormatter for OneLine {
///     fn format_with_config(
///         &self,
///         report: &ProfileReport,
///         _config: &FormatterConfig,
///     ) -> tsprofile::error::Result<String> {
///         Ok(format!("{}% constwaste", report.corpus.constwaste_percent))
///     }
/// }
/// ```
pub trait ReportFormatter {
    /// Formats with the default configuration.
    fn format(&self, report: &ProfileReport) -> Result<String> {
        self.format_with_config(report, &FormatterConfig::default())
    }

    fn format_with_config(&self, report: &ProfileReport, config: &FormatterConfig)
        -> Result<String>;
}

/// Serializes the report as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ProfileReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &ProfileReport, config: &FormatterConfig) -> Result<String> {
        let mut value = serde_json::to_value(report)?;
        if let serde_json::Value::Object(map) = &mut value {
            if !config.include_traces {
                map.remove("traces");
            }
            if !config.include_category_tables {
                map.remove("records");
            } else if let Some(serde_json::Value::Array(records)) = map.get_mut("records") {
                records.truncate(config.row_limit());
            }
            if !config.include_failures {
                map.remove("failures");
            }
            if !config.include_timestamps {
                map.remove("generated_at");
            }
            if !config.include_file_table {
                if let Some(serde_json::Value::Object(corpus)) = map.get_mut("corpus") {
                    corpus.remove("files");
                }
            }
        }

        let output = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(output)
    }
}

/// Plain text summary for terminals.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(text: String, code: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ProfileReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &ProfileReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let corpus = &report.corpus;
        let limit = config.row_limit();

        writeln!(output, "Signal profile")?;
        if config.include_timestamps {
            writeln!(output, "Generated: {}", report.generated_at.to_rfc3339())?;
        }
        writeln!(
            output,
            "Classifier: state threshold {}, scalars hidden below {}% change",
            report.state_threshold, report.min_change_percent
        )?;

        writeln!(output)?;
        writeln!(
            output,
            "Corpus: {} files, {} MB total, {} MB constwaste ({})",
            corpus.files.len(),
            corpus.total_file_size_mb,
            corpus.total_constwaste_mb,
            paint(
                format!("{}%", corpus.constwaste_percent),
                "33",
                config.use_colors
            )
        )?;

        if config.include_file_table && !corpus.files.is_empty() {
            writeln!(output)?;
            writeln!(output, "Files:")?;
            for file in corpus.files.iter().take(limit) {
                writeln!(
                    output,
                    "  {} rows={} size={} fields={} field_size={} interval={}ms columns={} constants={} constwaste={}",
                    file.file,
                    file.row_count,
                    file.file_size,
                    file.field_count,
                    file.field_size,
                    file.update_interval,
                    file.column_count,
                    file.constant_count,
                    file.constwaste
                )?;
            }
        }

        if config.include_category_tables {
            let tables = report.summary_tables();
            for category in Category::ALL {
                let records = tables.table(category);
                if records.is_empty() {
                    continue;
                }
                writeln!(output)?;
                writeln!(output, "{} columns ({}):", capitalize(category), records.len())?;
                for record in records.iter().take(limit) {
                    writeln!(
                        output,
                        "  {} [{}] {}",
                        record.trace_name(),
                        record.dtype,
                        details(&record.classification)
                    )?;
                }
            }
        }

        if config.include_failures && !report.failures.is_empty() {
            writeln!(output)?;
            writeln!(
                output,
                "{}",
                paint(
                    format!("Failed files ({}):", report.failures.len()),
                    "31",
                    config.use_colors
                )
            )?;
            for failure in &report.failures {
                writeln!(output, "  {}: {}", failure.file, failure.message)?;
            }
        }

        Ok(output)
    }
}

fn capitalize(category: Category) -> String {
    let name = category.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}

fn details(classification: &Classification) -> String {
    match classification {
        Classification::Constant { value } => format!("value={value}"),
        Classification::Boolean {
            true_count,
            false_count,
            change_count,
        } => format!("true={true_count} false={false_count} changes={change_count}"),
        Classification::State {
            distinct_count,
            unchanged_count,
            changed_count,
            value_counts,
            ..
        } => {
            let values: Vec<String> = value_counts
                .iter()
                .map(|vc| format!("{} ({})", vc.value, vc.count))
                .collect();
            format!(
                "distinct={distinct_count} changed={changed_count} unchanged={unchanged_count} values: {}",
                values.join(", ")
            )
        }
        Classification::Scalar {
            distinct_count,
            changed_percent,
            min,
            max,
            visibility,
        } => format!(
            "distinct={distinct_count} changed={changed_percent}% range=[{min}, {max}] visible: {visibility}"
        ),
    }
}

/// Markdown tables, one per section.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

const SHARED_HEADER: &str = "| File | Column | Type | Rows | Update interval (ms) |";
const SHARED_RULE: &str = "|------|--------|------|------|----------------------|";

fn category_header(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Constant => (" Value |", "-------|"),
        Category::Boolean => (" True | False | Changes |", "------|-------|---------|"),
        Category::State => (
            " Distinct | Changed | Unchanged | Values |",
            "----------|---------|-----------|--------|",
        ),
        Category::Scalar => (
            " Distinct | Changed % | Min | Max | Visible |",
            "----------|-----------|-----|-----|---------|",
        ),
    }
}

fn category_cells(record: &ColumnRecord) -> String {
    match &record.classification {
        Classification::Constant { value } => format!(" {} |", escape(&value.to_string())),
        Classification::Boolean {
            true_count,
            false_count,
            change_count,
        } => format!(" {true_count} | {false_count} | {change_count} |"),
        Classification::State {
            distinct_count,
            unchanged_count,
            changed_count,
            value_counts,
            ..
        } => {
            let values: Vec<String> = value_counts
                .iter()
                .map(|vc| format!("{}: {}", vc.value, vc.count))
                .collect();
            format!(
                " {distinct_count} | {changed_count} | {unchanged_count} | {} |",
                escape(&values.join(", "))
            )
        }
        Classification::Scalar {
            distinct_count,
            changed_percent,
            min,
            max,
            visibility,
        } => format!(
            " {distinct_count} | {changed_percent} | {} | {} | {visibility} |",
            escape(&min.to_string()),
            escape(&max.to_string())
        ),
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &ProfileReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &ProfileReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let corpus = &report.corpus;
        let limit = config.row_limit();
        let h = "#".repeat(self.heading_level as usize);

        writeln!(output, "{h} Signal Profile")?;
        writeln!(output)?;
        if config.include_timestamps {
            writeln!(output, "**Generated:** {}", report.generated_at.to_rfc3339())?;
        }
        writeln!(output, "**State threshold:** {}", report.state_threshold)?;
        writeln!(
            output,
            "**Minimum change:** {}%",
            report.min_change_percent
        )?;

        writeln!(output)?;
        writeln!(output, "{h}# Corpus")?;
        writeln!(output)?;
        writeln!(output, "| Metric | Value |")?;
        writeln!(output, "|--------|-------|")?;
        writeln!(output, "| Files | {} |", corpus.files.len())?;
        writeln!(output, "| Total size | {} MB |", corpus.total_file_size_mb)?;
        writeln!(output, "| Constwaste | {} MB |", corpus.total_constwaste_mb)?;
        writeln!(output, "| Constwaste share | {}% |", corpus.constwaste_percent)?;

        if config.include_file_table && !corpus.files.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Files")?;
            writeln!(output)?;
            writeln!(
                output,
                "| File | Rows | Size | Fields | Field size | Update interval (ms) | Constwaste |"
            )?;
            writeln!(
                output,
                "|------|------|------|--------|------------|----------------------|------------|"
            )?;
            for file in corpus.files.iter().take(limit) {
                writeln!(
                    output,
                    "| {} | {} | {} | {} | {} | {} | {} |",
                    escape(&file.file),
                    file.row_count,
                    file.file_size,
                    file.field_count,
                    file.field_size,
                    file.update_interval,
                    file.constwaste
                )?;
            }
        }

        if config.include_category_tables {
            let tables = report.summary_tables();
            for category in Category::ALL {
                let records = tables.table(category);
                if records.is_empty() {
                    continue;
                }
                let (header, rule) = category_header(category);
                writeln!(output)?;
                writeln!(output, "{h}# {} columns", capitalize(category))?;
                writeln!(output)?;
                writeln!(output, "{SHARED_HEADER}{header}")?;
                writeln!(output, "{SHARED_RULE}{rule}")?;
                for record in records.iter().take(limit) {
                    writeln!(
                        output,
                        "| {} | {} | {} | {} | {:.1} |{}",
                        escape(&record.file),
                        escape(&record.column),
                        record.dtype,
                        record.row_count,
                        record.update_interval,
                        category_cells(record)
                    )?;
                }
                if records.len() > limit {
                    writeln!(output)?;
                    writeln!(output, "*{} more rows omitted*", records.len() - limit)?;
                }
            }
        }

        if config.include_failures && !report.failures.is_empty() {
            writeln!(output)?;
            writeln!(output, "{h}# Failed files")?;
            writeln!(output)?;
            for failure in &report.failures {
                writeln!(output, "- **{}**: {}", failure.file, failure.message)?;
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CorpusSummary, FileSummary};
    use crate::profiler::FileFailure;
    use crate::render::RenderGroups;
    use crate::table::{DataKind, Value};
    use crate::visibility::Visibility;

    fn create_test_report() -> ProfileReport {
        let record = |column: &str, classification| ColumnRecord {
            file: "can".into(),
            column: column.into(),
            dtype: DataKind::Integer,
            row_count: 100,
            update_interval: 10.0,
            classification,
        };
        let records = vec![
            record(
                "status",
                Classification::Constant {
                    value: Value::Text("OK".into()),
                },
            ),
            record(
                "rpm",
                Classification::Scalar {
                    distinct_count: 80,
                    changed_percent: 64,
                    min: Value::Integer(0),
                    max: Value::Integer(7000),
                    visibility: Visibility::Shown,
                },
            ),
        ];
        let corpus = CorpusSummary::from_files(vec![FileSummary {
            file: "can".into(),
            row_count: 100,
            file_size: 2_000_000,
            field_count: 300,
            field_size: 6667,
            update_interval: 10,
            column_count: 2,
            constant_count: 1,
            constwaste: 1_000_000,
        }]);

        ProfileReport {
            generated_at: chrono::Utc::now(),
            state_threshold: 6,
            min_change_percent: 3,
            corpus,
            records,
            traces: RenderGroups::default(),
            failures: vec![FileFailure {
                file: "gps".into(),
                message: "Structural input error in 'gps': missing 'timestamp' column".into(),
            }],
        }
    }

    #[test]
    fn test_formatter_config() {
        let minimal = FormatterConfig::minimal();
        assert!(!minimal.include_category_tables);
        assert!(!minimal.use_colors);

        let ci = FormatterConfig::ci();
        assert_eq!(ci.max_rows, Some(50));
        assert!(!ci.include_traces);

        let custom = FormatterConfig::default().with_colors(false).with_max_rows(1);
        assert_eq!(custom.row_limit(), 1);
    }

    #[test]
    fn test_json_formatter() {
        let report = create_test_report();
        let output = JsonFormatter::new().format(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["corpus"]["constwaste_percent"], 50);
        assert_eq!(parsed["records"][0]["classification"]["type"], "constant");
        assert!(parsed.get("traces").is_some());

        let trimmed = JsonFormatter::with_config(FormatterConfig::minimal())
            .with_pretty(false)
            .format(&report)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&trimmed).unwrap();
        assert!(parsed.get("traces").is_none());
        assert!(parsed.get("records").is_none());
        assert!(parsed.get("generated_at").is_none());
        assert!(parsed["corpus"].get("files").is_none());
        assert_eq!(parsed["failures"][0]["file"], "gps");
    }

    #[test]
    fn test_human_formatter() {
        let report = create_test_report();
        let formatter = HumanFormatter::with_config(FormatterConfig::default().with_colors(false));
        let output = formatter.format(&report).unwrap();

        assert!(output.contains("Corpus: 1 files, 2 MB total, 1 MB constwaste (50%)"));
        assert!(output.contains("Constant columns (1):"));
        assert!(output.contains("status(can) [int64] value=OK"));
        assert!(output.contains("range=[0, 7000] visible: Yes"));
        assert!(output.contains("Failed files (1):"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_markdown_formatter() {
        let report = create_test_report();
        let output = MarkdownFormatter::new()
            .with_heading_level(1)
            .format(&report)
            .unwrap();

        assert!(output.starts_with("# Signal Profile"));
        assert!(output.contains("## Scalar columns"));
        assert!(output.contains("| can | rpm | int64 | 100 | 10.0 | 80 | 64 | 0 | 7000 | Yes |"));
        assert!(output.contains("| Constwaste share | 50% |"));
        assert!(output.contains("- **gps**: Structural input error"));
    }

    #[test]
    fn test_row_limit() {
        let report = create_test_report();
        let config = FormatterConfig::default().with_max_rows(0);
        let output = MarkdownFormatter::with_config(config.clone())
            .format(&report)
            .unwrap();
        assert!(output.contains("*1 more rows omitted*"));

        let json = JsonFormatter::with_config(config).format(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["records"].as_array().map(Vec::len), Some(0));
    }
}
