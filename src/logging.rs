//! Logging configuration for ioc-container
//!
//! The container emits `tracing` events under the `ioc_container` target:
//! container creation, registration, plan compilation and singleton
//! creation at DEBUG, and every resolve at TRACE. This module sets up a
//! subscriber to print them.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - Human-readable output
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_container::logging;
//!
//! // Default settings (JSON if logging-json, pretty if logging-pretty)
//! logging::init();
//!
//! // Or use the builder
//! logging::builder()
//!     .trace()
//!     .container_only()
//!     .compact()
//!     .init();
//! ```

use tracing::Level;

/// Target used by every event this crate emits.
pub const TARGET: &str = "ioc_container";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, human-readable
    Pretty,
    Compact,
}

/// Which events pass the filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Filter {
    /// Everything at the configured level
    #[default]
    Everything,
    /// Container events at the configured level, everything else at WARN
    ContainerFocused,
    /// Only the listed targets
    Targets(Vec<&'static str>),
}

/// Configures and installs a `tracing` subscriber for container events.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    filter: Filter,
    respect_env: bool,
    source_location: bool,
    thread_info: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            filter: Filter::default(),
            respect_env: false,
            source_location: false,
            thread_info: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(self, level: Level) -> Self {
        Self { level, ..self }
    }

    /// TRACE: every resolve is logged
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// DEBUG: container lifecycle, compilation and failures
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Show only events whose target is `target`. Repeat to allow several.
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        match &mut self.filter {
            Filter::Targets(targets) => targets.push(target),
            other => *other = Filter::Targets(vec![target]),
        }
        self
    }

    /// Show only this crate's events.
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Keep other crates' events, but quiet them down to WARN.
    pub fn container_focused(mut self) -> Self {
        self.filter = Filter::ContainerFocused;
        self
    }

    /// Let a `RUST_LOG` directive, when set, replace the configured filter
    pub fn from_env(mut self) -> Self {
        self.respect_env = true;
        self
    }

    /// Include file and line of each event.
    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    /// Include thread ids and names; useful when tracing concurrent
    /// singleton creation.
    pub fn with_thread_info(mut self) -> Self {
        self.thread_info = true;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn json(self) -> Self {
        self.with_format(LogFormat::Json)
    }

    pub fn pretty(self) -> Self {
        self.with_format(LogFormat::Pretty)
    }

    pub fn compact(self) -> Self {
        self.with_format(LogFormat::Compact)
    }

    /// The `EnvFilter` directive this configuration produces.
    pub fn directive(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        match &self.filter {
            Filter::Everything => level,
            Filter::ContainerFocused => format!("warn,{TARGET}={level}"),
            Filter::Targets(targets) => targets
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Install the subscriber as the global default.
    ///
    /// Does nothing if a global subscriber is already installed. Without
    /// `logging-json` or `logging-pretty` there is no subscriber to install
    /// and this is a no-op.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let directive = self.directive();
        let filter = match self.respect_env {
            true => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive)),
            false => EnvFilter::new(&directive),
        };

        let events = fmt::layer()
            .with_target(!matches!(self.filter, Filter::Targets(ref t) if t.len() == 1))
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_ids(self.thread_info)
            .with_thread_names(self.thread_info);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => events.json().boxed(),
            // Without the json formatter, fall back to the default format
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => events.boxed(),
            LogFormat::Pretty => events.pretty().boxed(),
            LogFormat::Compact => events.compact().boxed(),
        };

        // An already installed subscriber keeps priority.
        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init();
    }

    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
///
/// JSON if `logging-json` is enabled, otherwise pretty.
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();

    #[cfg(not(feature = "logging-json"))]
    init_pretty();
}

/// Initialize JSON structured logging at DEBUG
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Creating DI container","depth":0},"target":"ioc_container"}
/// ```
pub fn init_json() {
    builder().json().debug().init();
}

/// Initialize human-readable logging at DEBUG
pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Initialize logging for this crate's events only
pub fn init_container_only() {
    builder().container_only().debug().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_log_everything_at_debug() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
        assert_eq!(builder.filter, Filter::Everything);
        assert_eq!(builder.directive(), "debug");
    }

    #[test]
    fn test_container_only_directive() {
        let builder = LoggingBuilder::new()
            .trace()
            .pretty()
            .with_source_location()
            .container_only();

        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.source_location);
        assert_eq!(builder.directive(), "ioc_container=trace");
    }

    #[test]
    fn test_container_focused_quiets_other_targets() {
        let builder = builder().container_focused();
        assert_eq!(builder.directive(), "warn,ioc_container=debug");
    }

    #[test]
    fn test_target_filters_accumulate() {
        let builder = builder().info().container_only().with_target_filter("app");
        assert_eq!(builder.directive(), "ioc_container=info,app=info");

        // Switching to a focused filter drops the target list
        let builder = builder.container_focused();
        assert_eq!(builder.filter, Filter::ContainerFocused);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        builder().compact().warn().with_thread_info().init();
        builder().compact().warn().init();
    }
}
