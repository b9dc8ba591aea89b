//! Logging configuration for profiling runs.
//!
//! Profiling touches every sample of every column, so per-column logging is
//! opt-in and gated behind [`LogConfig`] flags checked before any formatting
//! happens.

use tracing::Level;

/// Controls how chatty the profiler is.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for profiler components
    pub base_level: Level,
    /// Whether to log one line per classified column
    pub log_column_details: bool,
    /// Whether to log file loading and table-level operations
    pub log_data_operations: bool,
    /// Whether to log reduction ratios
    pub log_reductions: bool,
    /// Maximum length for logged field values (column values can be long text)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_column_details: false,
            log_data_operations: true,
            log_reductions: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Logs everything, down to each column's classification.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_column_details: true,
            log_data_operations: true,
            log_reductions: true,
            max_field_length: 1024,
        }
    }

    /// Warnings only.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_column_details: false,
            log_data_operations: false,
            log_reductions: false,
            max_field_length: 128,
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Debug logging that skips argument evaluation below the configured level.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Per-column logging, enabled by [`LogConfig::log_column_details`](crate::logging::LogConfig).
#[macro_export]
macro_rules! log_column {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_column_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Data operation logging, enabled by [`LogConfig::log_data_operations`](crate::logging::LogConfig).
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, respecting char boundaries.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for binaries and tests embedding the profiler.
pub mod setup {
    use tracing::Level;

    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything else
        pub level: Level,
        /// Log level for `tsprofile` targets
        pub profiler_level: Level,
        /// Whether to emit JSON lines
        pub json_format: bool,
        /// Overrides the generated filter string
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                profiler_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                profiler_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                profiler_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_profiler_level(mut self, level: Level) -> Self {
            self.profiler_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            match self.env_filter {
                Some(ref filter) => filter.clone(),
                None => format!(
                    "{},tsprofile={}",
                    self.level.as_str().to_lowercase(),
                    self.profiler_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber. `RUST_LOG` wins over the config.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tsprofile::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_column_details);
        assert!(config.log_data_operations);

        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_column_details);
        assert!(verbose.log_reductions);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_data_operations);
        assert_eq!(production.max_field_length, 128);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // never splits a multi-byte character
        assert_eq!(truncate_field("ääää", 3), "ä...(truncated)");
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,tsprofile=debug");
        assert_eq!(LoggingConfig::production().env_filter(), "warn,tsprofile=info");
        assert_eq!(
            LoggingConfig::default().with_env_filter("trace").env_filter(),
            "trace"
        );
    }

    #[test]
    fn test_perf_debug_follows_base_level() {
        let evaluated = std::cell::Cell::new(0);
        let field = || {
            evaluated.set(evaluated.get() + 1);
            "rpm(can)"
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            perf_debug!(LogConfig::production(), trace = field(), "Reduced trace");
            assert_eq!(evaluated.get(), 0);

            perf_debug!(LogConfig::verbose(), trace = field(), "Reduced trace");
            assert_eq!(evaluated.get(), 1);
        });
    }
}
