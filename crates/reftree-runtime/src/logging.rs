//! Structured logging configuration.
//!
//! The resolver reports every warning through `tracing` with a `path`
//! field and the warning's own fields (`entity`, `relation`, `object`,
//! `error`), and logs cache decisions at `debug`. This module
//! installs a `tracing-subscriber` that renders those events.
//!
//! # Log Format
//!
//! When JSON formatting is enabled, log entries are output as JSON objects:
//!
//! ```json
//! {"timestamp":"2024-01-15T10:30:00.000Z","level":"WARN","target":"reftree_domain::resolver::report","fields":{"message":"the relation owner could not be found in object parcel_01","path":"parcels/owner","relation":"owner","object":"parcel_01"}}
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::{ConfigLoadError, LoggingSettings};

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to use JSON format (true) or text format (false)
    pub json_format: bool,
    /// The default log level if RUST_LOG is not set
    pub default_level: Level,
    /// Whether to include span events (enter/exit)
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
            include_spans: false,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration for JSON output.
    pub fn json() -> Self {
        Self {
            json_format: true,
            ..Default::default()
        }
    }

    /// Create a new logging configuration for text output (development).
    pub fn text() -> Self {
        Self {
            json_format: false,
            ..Default::default()
        }
    }

    /// Set the default log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Include span events in the output.
    pub fn with_spans(mut self) -> Self {
        self.include_spans = true;
        self
    }

    /// Builds a logging configuration from loaded settings.
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, ConfigLoadError> {
        let level = Level::from_str(&settings.level).map_err(|_| ConfigLoadError::Invalid {
            message: format!("logging.level is not a log level: {}", settings.level),
        })?;
        let mut config = if settings.json {
            Self::json()
        } else {
            Self::text()
        };
        config.include_spans = settings.spans;
        Ok(config.with_level(level))
    }
}

/// Initialize the logging subsystem with the given configuration.
///
/// This should be called once at application startup. If called multiple times,
/// subsequent calls will have no effect (the subscriber is global).
pub fn init_logging(config: LoggingConfig) {
    // Build the filter from RUST_LOG env var or use default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    let span_events = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );

        // Ignore if a global subscriber is already set
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(true),
        );

        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Creates a JSON-formatted subscriber writing to `writer`, for tests that
/// capture and inspect log output.
pub fn create_json_layer<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reftree_domain::{
        CallIdentity, FetchError, FetchRequest, Fetched, PlanNode, ReferenceResolver, RootPlan,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// A writer that captures output to a shared buffer.
    #[derive(Clone)]
    struct CaptureWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CaptureWriter {
        fn new() -> Self {
            Self {
                buffer: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn get_output(&self) -> String {
            let buffer = self.buffer.lock().unwrap();
            String::from_utf8_lossy(&buffer).to_string()
        }

        fn json_lines(&self) -> Vec<Value> {
            self.get_output()
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.json_format);
        assert_eq!(config.default_level, Level::INFO);
        assert!(!config.include_spans);
    }

    #[test]
    fn test_logging_config_builders() {
        assert!(LoggingConfig::json().json_format);
        assert!(!LoggingConfig::text().json_format);
        assert!(LoggingConfig::default().with_spans().include_spans);
        assert_eq!(
            LoggingConfig::default()
                .with_level(Level::DEBUG)
                .default_level,
            Level::DEBUG
        );
    }

    #[test]
    fn test_logging_config_from_settings() {
        let settings = LoggingSettings {
            level: "warn".to_string(),
            json: true,
            spans: true,
        };
        let config = LoggingConfig::from_settings(&settings).unwrap();
        assert!(config.json_format);
        assert!(config.include_spans);
        assert_eq!(config.default_level, Level::WARN);

        let settings = LoggingSettings {
            level: "loud".to_string(),
            json: false,
            spans: false,
        };
        assert!(LoggingConfig::from_settings(&settings).is_err());
    }

    /// Test: Structured logs are JSON formatted
    #[test]
    fn test_structured_logs_are_json_formatted() {
        use tracing::info;

        let writer = CaptureWriter::new();
        let subscriber = create_json_layer(writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!(entity = "address", ids = 3, "dispatching fetch");
        });

        let lines = writer.json_lines();
        assert!(!lines.is_empty(), "Should have captured log output");
        for json in lines {
            assert!(json.get("level").is_some(), "JSON log should have 'level' field");
            assert!(json.get("target").is_some(), "JSON log should have 'target' field");
        }
    }

    /// Test: Resolver warnings reach the log with their plan path
    #[tokio::test]
    async fn test_resolve_warning_is_logged_with_path() {
        let writer = CaptureWriter::new();
        let _guard = tracing::subscriber::set_default(create_json_layer(writer.clone()));

        let plan = RootPlan::new(CallIdentity::new("parcels"), "parcels")
            .fetch_with(|| async {
                Ok::<_, FetchError>(Fetched::from_json(json!([{"id": "parcel_01"}])))
            })
            .with_ref(PlanNode::new("owner").fetch_with(|_: FetchRequest| async {
                Ok::<_, FetchError>(Fetched::Nothing)
            }));
        let report = ReferenceResolver::new().resolve(&plan).await;
        assert_eq!(report.warnings.len(), 1);

        let warning = writer
            .json_lines()
            .into_iter()
            .find(|line| line["level"] == "WARN")
            .expect("a warning should be logged");
        assert_eq!(warning["fields"]["path"], "parcels/owner");
        assert_eq!(warning["fields"]["relation"], "owner");
        assert_eq!(warning["fields"]["object"], "parcel_01");
        assert_eq!(
            warning["fields"]["message"],
            "the relation owner could not be found in object parcel_01"
        );
    }
}
