//! Structured logging for PageWatch.
//!
//! Console plus rolling NDJSON file output, redaction of tokens and sensitive
//! query parameters, and the telemetry event stream shared by the reporter
//! and the collector.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{TelemetryEvent, TelemetryLogEntry, TelemetryLogger, EVENT_TARGET};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
